//! # TLV Codec
//!
//! Tag-length-value records carried inside SNAC payloads and FLAP sign-on frames.
//!
//! ## Wire Format
//! ```text
//! [Tag(2)] [Length(2)] [Value(Length)]
//! ```
//! Both header fields are big-endian. A record is exactly `4 + length` bytes.

use bytes::{BufMut, BytesMut};

use crate::error::{ProtocolError, Result};

/// Size of the tag + length header.
pub const TLV_HEADER_LEN: usize = 4;

/// Largest value a single record can carry.
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// A single tag-length-value record. The length is always derived from `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tlv {
    pub tag: u16,
    pub value: Vec<u8>,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Record whose value is a single big-endian u16 (error codes and flags).
    pub fn from_u16(tag: u16, value: u16) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    /// Wire length of the value. Fails for values past [`MAX_VALUE_LEN`].
    pub fn length(&self) -> Result<u16> {
        u16::try_from(self.value.len()).map_err(|_| ProtocolError::OversizedValue {
            tag: self.tag,
            len: self.value.len(),
        })
    }

    pub fn encoded_len(&self) -> usize {
        TLV_HEADER_LEN + self.value.len()
    }

    /// Value interpreted as text, with invalid UTF-8 replaced.
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    pub fn value_u16(&self) -> Option<u16> {
        match self.value.as_slice() {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

/// Decode the record at the start of `buf`, returning it with the number of
/// bytes consumed.
pub fn decode_one(buf: &[u8]) -> Result<(Tlv, usize)> {
    if buf.len() < TLV_HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader);
    }

    let tag = u16::from_be_bytes([buf[0], buf[1]]);
    let length = usize::from(u16::from_be_bytes([buf[2], buf[3]]));
    let available = buf.len() - TLV_HEADER_LEN;

    if available < length {
        return Err(ProtocolError::TruncatedValue {
            expected: length,
            available,
        });
    }

    let value = buf[TLV_HEADER_LEN..TLV_HEADER_LEN + length].to_vec();
    Ok((Tlv { tag, value }, TLV_HEADER_LEN + length))
}

/// Decode records until `buf` is exhausted. Any malformed record, including a
/// dangling partial tail, fails the whole decode.
pub fn decode_all(buf: &[u8]) -> Result<Vec<Tlv>> {
    let mut tlvs = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let (tlv, consumed) = decode_one(&buf[offset..])?;
        tlvs.push(tlv);
        offset += consumed;
    }

    Ok(tlvs)
}

pub fn encode(tlv: &Tlv) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(tlv.encoded_len());
    encode_into(tlv, &mut buf)?;
    Ok(buf.to_vec())
}

/// Append `tlv` to `buf`. An oversized value leaves `buf` untouched.
pub fn encode_into(tlv: &Tlv, buf: &mut BytesMut) -> Result<()> {
    let length = tlv.length()?;
    buf.reserve(tlv.encoded_len());
    buf.put_u16(tlv.tag);
    buf.put_u16(length);
    buf.put_slice(&tlv.value);
    Ok(())
}

/// Concatenate the encodings of `tlvs` in order.
pub fn encode_all(tlvs: &[Tlv]) -> Result<Vec<u8>> {
    let total = tlvs.iter().map(Tlv::encoded_len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for tlv in tlvs {
        encode_into(tlv, &mut buf)?;
    }
    Ok(buf.to_vec())
}

/// First record with the given tag. Later duplicates are ignored.
pub fn find(tlvs: &[Tlv], tag: u16) -> Option<&Tlv> {
    tlvs.iter().find(|tlv| tlv.tag == tag)
}

/// Like [`find`], but a missing tag is an error.
pub fn require(tlvs: &[Tlv], tag: u16) -> Result<&Tlv> {
    find(tlvs, tag).ok_or(ProtocolError::MissingTlv(tag))
}
