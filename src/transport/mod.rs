//! # Transport
//!
//! TCP listeners for the login (BUCP) and service (BOS) ports, and the
//! per-connection driver both of them run.
//!
//! The driver is generic over `AsyncRead + AsyncWrite`, so tests can run it
//! over `tokio::io::duplex` without opening sockets.

pub mod connection;
pub mod listener;

pub use connection::{serve_connection, ListenerRole};
pub use listener::{
    serve_listener, start_listener_with_shutdown, start_server, start_server_with_shutdown,
};
