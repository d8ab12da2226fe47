//! # Error Types
//!
//! Error handling for the OSCAR login and hand-off core.
//!
//! Every failure here is scoped to a single connection. Nothing in this crate
//! is fatal to the process.
//!
//! ## Error Categories
//! - **Malformed frames**: bad FLAP marker, unknown frame kind, truncated header or
//!   payload. The connection is torn down.
//! - **Malformed messages**: SNAC/TLV decode failures and missing required TLVs.
//!   The message is dropped and the connection stays open.
//! - **Authentication failures**: no prior challenge. A wrong credential is
//!   answered with an error-coded reply, not an error.
//! - **Oversized output**: a reply whose TLV value or FLAP payload would not fit
//!   its 16-bit length field. Nothing is sent and no state changes.
//! - **Account failures**: the account collaborator could not resolve a user.
//! - **Registry misses**: a BOS connection presented an unknown cookie.
//!
//! ## Example Usage
//! ```rust
//! use oscar_protocol::core::tlv;
//! use oscar_protocol::error::ProtocolError;
//!
//! match tlv::decode_one(&[0x00, 0x01]) {
//!     Err(ProtocolError::TruncatedHeader) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

use crate::account::AccountError;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Randomness errors
    pub const ERR_CHALLENGE_RNG: &str = "Failed to generate login challenge";
    pub const ERR_COOKIE_RNG: &str = "Failed to generate BOS cookie";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid FLAP marker: 0x{0:02X}")]
    InvalidMarker(u8),

    #[error("Unknown FLAP frame kind: 0x{0:02X}")]
    UnknownFrame(u8),

    #[error("Truncated header")]
    TruncatedHeader,

    #[error("Truncated FLAP payload: expected {expected} bytes, {available} available")]
    TruncatedPayload { expected: usize, available: usize },

    #[error("Truncated TLV value: expected {expected} bytes, {available} available")]
    TruncatedValue { expected: usize, available: usize },

    #[error("FLAP payload of {0} bytes exceeds the 65535 byte limit")]
    OversizedPacket(usize),

    #[error("TLV 0x{tag:04X} value of {len} bytes exceeds the 65535 byte limit")]
    OversizedValue { tag: u16, len: usize },

    #[error("Required TLV 0x{0:04X} missing")]
    MissingTlv(u16),

    #[error("Login attempted without a prior challenge")]
    ChallengeMissing,

    #[error("Account lookup failed: {0}")]
    Account(#[from] AccountError),

    #[error("No pending session matches the presented cookie")]
    RegistryMiss,

    #[error("BOS cookie already pending")]
    DuplicateCookie,

    #[error("Session has not completed login")]
    NotAuthenticated,

    #[error("Random source failure: {0}")]
    Random(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Frame-level corruption. The stream can no longer be trusted and the
    /// connection must be closed.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidMarker(_)
                | ProtocolError::UnknownFrame(_)
                | ProtocolError::TruncatedPayload { .. }
        )
    }

    /// Message-level problems. The offending message is dropped silently and
    /// the connection stays open.
    pub fn is_malformed_message(&self) -> bool {
        matches!(
            self,
            ProtocolError::TruncatedHeader
                | ProtocolError::TruncatedValue { .. }
                | ProtocolError::MissingTlv(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
