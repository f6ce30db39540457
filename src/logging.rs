use crate::error::{PageDbError, Result};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| PageDbError::InvalidArgument(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .try_init()
        .map_err(|_| PageDbError::InvalidArgument("logging already initialized".into()))
}
