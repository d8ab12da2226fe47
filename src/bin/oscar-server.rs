//! OSCAR login and service listeners.
//!
//! Usage: `oscar-server [config.toml]`. Without an argument the path is read
//! from `OSCAR_CONFIG`; without either, defaults plus `OSCAR_*` overrides are
//! used.

use std::sync::Arc;

use oscar_protocol::transport::start_server;
use oscar_protocol::utils::logging;
use oscar_protocol::{MemoryAccountStore, OscarConfig, Result, Services, SessionRegistry};
use tracing::{info, warn};

fn load_config() -> Result<OscarConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("OSCAR_CONFIG").ok());

    match path {
        Some(path) => {
            let mut config = OscarConfig::from_file(&path)?;
            config.apply_env();
            Ok(config)
        }
        None => OscarConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    config.validate_strict()?;
    logging::init(&config.logging)?;

    let store = MemoryAccountStore::new();
    for account in &config.accounts {
        store.insert(account.clone())?;
    }
    if store.is_empty() {
        warn!("No accounts configured, logins cannot succeed");
    }

    info!(
        root = %config.server.root,
        bucp = %config.server.bucp_address,
        bos = %config.server.bos_address,
        accounts = store.len(),
        "Starting OSCAR server"
    );

    let services = Services::new(
        Arc::new(store),
        config.server.clone(),
        SessionRegistry::from_config(&config.registry),
    );

    start_server(services).await
}
