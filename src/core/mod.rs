//! # Core Protocol Components
//!
//! Wire codecs for the three nested layers of the OSCAR protocol.
//!
//! ## Components
//! - **FLAP**: outer length-prefixed frame with per-connection sequence numbers
//! - **SNAC**: foodgroup/subgroup addressed message inside a FLAP data frame
//! - **TLV**: tag-length-value records inside SNAC and sign-on payloads
//! - **Codec**: Tokio codec for FLAP framing over byte streams
//!
//! ## Wire Format
//! ```text
//! FLAP: [0x2A] [Frame(1)] [Sequence(2)] [Length(2)] [Data]
//! SNAC: [Foodgroup(2)] [Subgroup(2)] [Flags(2)] [RequestID(4)] [Data]
//! TLV:  [Tag(2)] [Length(2)] [Value]
//! ```
//!
//! All multi-byte integers are big-endian.

pub mod codec;
pub mod flap;
pub mod snac;
pub mod tlv;
