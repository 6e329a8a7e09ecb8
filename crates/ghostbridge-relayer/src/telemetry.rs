//! Tracing initialisation for the relayer process.

use ghostbridge_types::{BridgeError, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "ghostbridge=info,ghostbridge_relayer=info,ghostbridge_ledger=info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| BridgeError::Configuration(format!("tracing init failed: {err}")))
}
