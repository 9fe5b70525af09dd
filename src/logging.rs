use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{HeatNnError, Result};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "heat_nn=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .try_init()
        .map_err(|e| HeatNnError::Config(format!("failed to set up logging: {e}")))
}
