//! Tracing configuration and initialization.

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub struct Trc {
    env_filter: EnvFilter,
}

impl Default for Trc {
    fn default() -> Self {
        // RANGEFS_LOG takes priority, then RUST_LOG, then a quiet default.
        let env_filter = EnvFilter::try_from_env("RANGEFS_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        Self { env_filter }
    }
}

impl Trc {
    pub fn init(self) {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
    }
}
