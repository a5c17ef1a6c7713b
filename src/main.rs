//! Mount remote range-addressable objects as local read-only files.
use std::path::PathBuf;

use clap::Parser;
use tracing::error;

mod app_config;
mod daemon;
mod fuse_check;
mod trc;

use crate::app_config::Config;
use crate::trc::Trc;

#[derive(Parser)]
#[command(version, about = "A read-only filesystem over remote HTTP objects.")]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a rangefs config TOML."
    )]
    config_path: Option<PathBuf>,

    #[arg(short, long, value_parser, help = "Override the configured mount point.")]
    mount_point: Option<PathBuf>,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Errors use eprintln since tracing isn't initialized yet.
    let mut config = Config::load(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Some(mount_point) = args.mount_point {
        config.mount_point = mount_point;
    }
    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        std::process::exit(1);
    }

    Trc::default().init();

    if let Err(e) = fuse_check::ensure_fuse() {
        error!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = daemon::spawn(config) {
        error!("Daemon failed: {e}");
        std::process::exit(1);
    }
}
