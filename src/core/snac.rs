//! # SNAC Codec
//!
//! SNACs are the typed sub-messages carried in FLAP data frames, addressed by
//! foodgroup (functional area) and subgroup (operation).
//!
//! ## Wire Format
//! ```text
//! [Foodgroup(2)] [Subgroup(2)] [Flags(2)] [RequestID(4)] [Data(N)]
//! ```

use bytes::{BufMut, BytesMut};

use crate::core::flap;
use crate::core::tlv::{self, Tlv};
use crate::error::{ProtocolError, Result};

/// Fixed SNAC header size.
pub const SNAC_HEADER_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnacMessage {
    pub foodgroup: u16,
    pub subgroup: u16,
    pub flags: u16,
    pub request_id: u32,
    pub data: Vec<u8>,
}

impl SnacMessage {
    pub fn new(foodgroup: u16, subgroup: u16, data: Vec<u8>) -> Self {
        Self {
            foodgroup,
            subgroup,
            flags: 0,
            request_id: 0,
            data,
        }
    }

    /// SNAC whose payload is the concatenation of `tlvs`.
    ///
    /// Fails if any value or the resulting message would not fit in a FLAP
    /// data frame, so a built message can always be sent.
    pub fn with_tlvs(foodgroup: u16, subgroup: u16, tlvs: &[Tlv]) -> Result<Self> {
        let msg = Self::new(foodgroup, subgroup, tlv::encode_all(tlvs)?);
        flap::ensure_fits(msg.encoded_len())?;
        Ok(msg)
    }

    /// Routing key used by the dispatcher.
    pub fn key(&self) -> (u16, u16) {
        (self.foodgroup, self.subgroup)
    }

    /// Parse the payload as a TLV list.
    pub fn tlvs(&self) -> Result<Vec<Tlv>> {
        tlv::decode_all(&self.data)
    }

    pub fn encoded_len(&self) -> usize {
        SNAC_HEADER_LEN + self.data.len()
    }
}

pub fn decode(buf: &[u8]) -> Result<SnacMessage> {
    if buf.len() < SNAC_HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader);
    }

    Ok(SnacMessage {
        foodgroup: u16::from_be_bytes([buf[0], buf[1]]),
        subgroup: u16::from_be_bytes([buf[2], buf[3]]),
        flags: u16::from_be_bytes([buf[4], buf[5]]),
        request_id: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),
        data: buf[SNAC_HEADER_LEN..].to_vec(),
    })
}

pub fn encode(msg: &SnacMessage) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(msg.encoded_len());
    buf.put_u16(msg.foodgroup);
    buf.put_u16(msg.subgroup);
    buf.put_u16(msg.flags);
    buf.put_u32(msg.request_id);
    buf.put_slice(&msg.data);
    buf.to_vec()
}
