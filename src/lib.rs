//! # oscar-protocol
//!
//! Server-side core of the OSCAR protocol used by AIM clients: FLAP framing,
//! SNAC and TLV codecs, BUCP challenge/response login, direct sign-on, and the
//! cookie hand-off from the login listener to the service (BOS) listener.
//!
//! ## Layers
//! - [`core`]: wire codecs (FLAP, SNAC, TLV) and the tokio [`FlapCodec`](core::codec::FlapCodec)
//! - [`protocol`]: authentication state machine, BOS claim, dispatcher
//! - [`session`]: per-connection context and the shared pending-session registry
//! - [`transport`]: TCP listeners and the per-connection driver
//! - [`account`]: account lookup collaborator
//!
//! ## Example
//! ```rust
//! use oscar_protocol::core::flap::{self, FlapPacket, FrameKind};
//!
//! let bytes = flap::encode(&FlapPacket::sign_on_greeting(7)).unwrap();
//! assert_eq!(bytes, vec![0x2A, 0x01, 0x00, 0x07, 0x00, 0x04, 0, 0, 0, 1]);
//!
//! let frames = flap::decode_all(&bytes).unwrap();
//! assert_eq!(frames[0].frame, FrameKind::SignOn);
//! ```

pub mod account;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod utils;

pub use account::{AccountError, AccountIdentity, AccountStore, MemoryAccountStore, UserProfile};
pub use config::OscarConfig;
pub use error::{ProtocolError, Result};
pub use protocol::Services;
pub use session::{SessionContext, SessionRegistry};
