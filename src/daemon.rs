use std::sync::Arc;
use std::time::Duration;

use range_client::HttpRangeClient;
use rangefs::fs::{FileSpec, Namespace};
use tokio::select;

use crate::app_config;
use tracing::{debug, info};

/// Per-request timeout for remote fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

mod managed_fuse {
    //! This module feels a little confusing, but it's designed to help you manage the lifecycle of
    //! fuse slightly better. fuser will not attempt to fuse unmount the filesystem when the
    //! `BackgroundSession` is dropped, and will only do a regular unmount, but we want to be
    //! aggressive and force an unmount if possible.
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use nix::errno::Errno;
    use range_client::HttpRangeClient;
    use rangefs::fs::Namespace;
    use rangefs::fs::fuser::FuserAdapter;
    use tracing::{debug, error};

    use fuser::BackgroundSession;

    pub struct FuseCoreScope {
        _session: BackgroundSession,
    }

    impl FuseCoreScope {
        fn spawn(
            namespace: Arc<Namespace<HttpRangeClient>>,
            mount_point: &std::path::Path,
            handle: tokio::runtime::Handle,
        ) -> Result<Self, std::io::Error> {
            let fuse_adapter = FuserAdapter::new(namespace, handle);
            let mount_opts = [
                fuser::MountOption::FSName("rangefs".to_owned()),
                fuser::MountOption::RO,
                fuser::MountOption::NoDev,
                fuser::MountOption::AutoUnmount,
            ];

            Ok(Self {
                _session: fuser::spawn_mount2(fuse_adapter, mount_point, &mount_opts)?,
            })
        }
    }

    pub struct ManagedFuse {
        mount_point: PathBuf,
    }

    impl ManagedFuse {
        pub fn new(mount_point: &std::path::Path) -> Self {
            Self {
                mount_point: mount_point.to_path_buf(),
            }
        }

        pub fn spawn(
            &self,
            namespace: Arc<Namespace<HttpRangeClient>>,
            handle: tokio::runtime::Handle,
        ) -> Result<FuseCoreScope, std::io::Error> {
            FuseCoreScope::spawn(namespace, &self.mount_point, handle)
        }
    }

    impl Drop for ManagedFuse {
        fn drop(&mut self) {
            const UMOUNT_ATTEMPT_COUNT: usize = 10;
            const UMOUNT_ATTEMPT_DELAY: Duration = Duration::from_millis(10);

            debug!(mount_point = ?self.mount_point, "Confirming unmount of FUSE filesystem...");

            for i in 0..UMOUNT_ATTEMPT_COUNT {
                let result = {
                    #[cfg(target_os = "macos")]
                    {
                        nix::mount::unmount(&self.mount_point, nix::mount::MntFlags::MNT_FORCE)
                    }

                    #[cfg(target_os = "linux")]
                    {
                        nix::mount::umount2(&self.mount_point, nix::mount::MntFlags::MNT_DETACH)
                    }
                };

                match result {
                    Ok(()) => {
                        debug!(
                            "Successfully unmounted FUSE filesystem on attempt {}",
                            i + 1
                        );
                        break;
                    }
                    Err(Errno::EBUSY) => {
                        debug!(
                            "FUSE filesystem still busy on attempt {}. Retrying...",
                            i + 1
                        );
                        std::thread::sleep(UMOUNT_ATTEMPT_DELAY);
                    }
                    Err(Errno::EINVAL | Errno::ENOENT) => {
                        debug!("FUSE filesystem already unmounted (attempt {})", i + 1);
                        break;
                    }
                    Err(e) => {
                        error!(
                            "Failed to unmount FUSE filesystem on attempt {}: {}",
                            i + 1,
                            e
                        );
                        break;
                    }
                }
            }
        }
    }
}

/// Prepares the mount point directory.
///
/// - If the directory exists and is non-empty, returns an error.
/// - If the directory does not exist, creates it (including parents) and logs an info message.
/// - If the directory exists and is empty, does nothing.
async fn prepare_mount_point(mount_point: &std::path::Path) -> Result<(), std::io::Error> {
    match tokio::fs::read_dir(mount_point).await {
        Ok(mut entries) => {
            if entries.next_entry().await?.is_some() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!(
                        "Mount point '{}' already exists and is not empty.",
                        mount_point.display()
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(mount_point).await?;
            info!(path = %mount_point.display(), "Created mount point directory.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn wait_for_exit() -> Result<(), std::io::Error> {
    use tokio::signal;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut sighup = signal::unix::signal(signal::unix::SignalKind::hangup())?;
    select! {
        _ = signal::ctrl_c() => {
            debug!("Received Ctrl+C signal, shutting down...");
        },
        _ = sigterm.recv() => {
            debug!("Received termination signal, shutting down...");
        },
        _ = sighup.recv() => {
            debug!("Received hangup signal, shutting down...");
        },
    }
    Ok(())
}

/// Main entry point for the daemon.
pub async fn run(
    config: app_config::Config,
    handle: tokio::runtime::Handle,
) -> Result<(), std::io::Error> {
    let client = HttpRangeClient::with_timeout(FETCH_TIMEOUT);
    let specs = config
        .files
        .iter()
        .map(|entry| FileSpec {
            name: entry.name.clone(),
            url: entry.url.clone(),
        })
        .collect();

    info!(files = config.files.len(), "Resolving remote file sizes...");
    let namespace = Namespace::assemble(client, specs, config.block_size.as_u64())
        .await
        .map(Arc::new)
        .map_err(std::io::Error::other)?;

    prepare_mount_point(&config.mount_point).await?;

    info!("Mounting filesystem at {}.", config.mount_point.display());

    let fuse = managed_fuse::ManagedFuse::new(&config.mount_point);
    {
        let _session = fuse.spawn(namespace, handle.clone())?;
        info!("rangefs is running. Press Ctrl+C to stop.");

        wait_for_exit().await?;
    }
    Ok(())
}

pub fn spawn(config: app_config::Config) -> Result<(), std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, runtime.handle().clone()))
}
