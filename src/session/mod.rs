//! # Session State
//!
//! Per-connection [`SessionContext`] and the process-wide [`SessionRegistry`]
//! that hands authenticated contexts from the login listener to the service
//! listener.

pub mod context;
pub mod registry;

pub use context::{AuthPhase, BosCookie, SessionContext, BOS_COOKIE_LEN, CHALLENGE_LEN};
pub use registry::{RegistryStats, SessionRegistry};
