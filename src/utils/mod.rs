//! # Utility Modules
//!
//! Supporting utilities shared by both listeners.
//!
//! ## Components
//! - **Logging**: tracing subscriber setup from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: thread-safe counters for the login and hand-off flow
//! - **Random**: OS-backed nonces, cookies and sequence seeds (getrandom)

pub mod logging;
pub mod metrics;
pub mod random;

pub use metrics::{Metrics, MetricsSnapshot};
