use crate::core::flap::FlapPacket;
use crate::core::snac::SnacMessage;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::Services;
use crate::session::SessionContext;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Future returned by a SNAC handler: the frames to send back, in order.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Vec<FlapPacket>>>;

type HandlerFn = dyn for<'a> Fn(&'a mut SessionContext, &'a Services, SnacMessage) -> HandlerFuture<'a>
    + Send
    + Sync
    + 'static;

/// SNAC dispatcher keyed by `(foodgroup, subgroup)`.
///
/// Handlers are stored behind `Arc` so a handler can be cloned out of the
/// table and awaited without holding the lock.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<(u16, u16), Arc<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register<F>(&self, foodgroup: u16, subgroup: u16, handler: F) -> Result<()>
    where
        F: for<'a> Fn(&'a mut SessionContext, &'a Services, SnacMessage) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert((foodgroup, subgroup), Arc::new(handler));
        Ok(())
    }

    pub fn is_registered(&self, foodgroup: u16, subgroup: u16) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(&(foodgroup, subgroup)))
            .unwrap_or(false)
    }

    pub async fn dispatch(
        &self,
        session: &mut SessionContext,
        services: &Services,
        msg: SnacMessage,
    ) -> Result<Vec<FlapPacket>> {
        let handler = {
            let handlers = self.handlers.read().map_err(|_| {
                ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
            })?;

            handlers
                .get(&msg.key())
                .cloned()
                .ok_or(ProtocolError::UnexpectedMessage)?
        };

        handler(session, services, msg).await
    }
}
