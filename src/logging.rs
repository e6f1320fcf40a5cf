//! Tracing setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used. Output
//! goes to stderr in compact form so stdout stays free for the summary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::QuickApplyError;

pub fn filter_for(level: &str) -> Result<EnvFilter, QuickApplyError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| QuickApplyError::Logging(format!("invalid log filter '{level}': {e}")))
}

pub fn init(level: &str) -> Result<(), QuickApplyError> {
    let filter = filter_for(level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| QuickApplyError::Logging(e.to_string()))
}
