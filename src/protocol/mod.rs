//! # Protocol Logic
//!
//! Everything above the wire codecs: the BUCP authentication state machine,
//! the BOS hand-off, password schemes and the SNAC dispatcher.
//!
//! ## Flow
//! 1. A client connects to the login listener and requests a challenge
//! 2. It answers with an MD5 digest (or signs on directly with a roasted password)
//! 3. On success it gets a cookie and the BOS address, and the session is published
//! 4. It reconnects to the BOS listener and presents the cookie
//! 5. The BOS listener claims the session and advertises supported foodgroups

pub mod bucp;
pub mod dispatcher;
pub mod foodgroup;
pub mod oservice;
pub mod password;

use std::sync::Arc;

use crate::account::AccountStore;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::SessionRegistry;
use crate::utils::metrics::Metrics;

pub use dispatcher::{Dispatcher, HandlerFuture};

/// Collaborators shared by every connection on both listeners.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<dyn AccountStore>,
    pub config: Arc<ServerConfig>,
    pub registry: SessionRegistry,
    pub metrics: Arc<Metrics>,
}

impl Services {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        config: ServerConfig,
        registry: SessionRegistry,
    ) -> Self {
        Self {
            accounts,
            config: Arc::new(config),
            registry,
            metrics: Arc::new(Metrics::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            Arc::new(crate::account::MemoryAccountStore::new()),
            ServerConfig::default(),
            SessionRegistry::default(),
        )
    }
}

/// Dispatch table for the login listener.
pub fn bucp_dispatcher() -> Result<Dispatcher> {
    let dispatcher = Dispatcher::new();
    dispatcher.register(
        foodgroup::BUCP,
        foodgroup::bucp::CHALLENGE_REQUEST,
        bucp::handle_challenge_request,
    )?;
    dispatcher.register(
        foodgroup::BUCP,
        foodgroup::bucp::LOGIN_REQUEST,
        bucp::handle_login_request,
    )?;
    Ok(dispatcher)
}

/// Dispatch table for the service listener.
///
/// Messaging foodgroups are advertised in `HostOnline` but have no handlers in
/// this crate; embedders register theirs on the returned dispatcher.
pub fn bos_dispatcher() -> Result<Dispatcher> {
    Ok(Dispatcher::new())
}
