//! # FLAP Framing
//!
//! FLAP is the outermost layer of the protocol: a length-prefixed frame that
//! carries either a SNAC (data frames) or raw sign-on/sign-off TLVs.
//!
//! ## Wire Format
//! ```text
//! [Marker(1)=0x2A] [Frame(1)] [Sequence(2)] [DataLength(2)] [Data(DataLength)]
//! ```
//!
//! Sequence numbers are session state, not frame state: the sender stamps each
//! outgoing frame from its [`SessionContext`](crate::session::SessionContext).

use bytes::{BufMut, BytesMut};

use crate::core::snac::{self, SnacMessage};
use crate::core::tlv::{self, Tlv};
use crate::error::{ProtocolError, Result};

/// First byte of every FLAP frame.
pub const FLAP_MARKER: u8 = 0x2A;

/// Marker + frame + sequence + length.
pub const FLAP_HEADER_LEN: usize = 6;

/// Largest payload a frame can describe.
pub const MAX_FLAP_DATA_LEN: usize = u16::MAX as usize;

/// FLAP protocol version sent at the start of every sign-on frame.
pub const FLAP_VERSION: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    SignOn = 0x01,
    Data = 0x02,
    Error = 0x03,
    SignOff = 0x04,
}

impl TryFrom<u8> for FrameKind {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(FrameKind::SignOn),
            0x02 => Ok(FrameKind::Data),
            0x03 => Ok(FrameKind::Error),
            0x04 => Ok(FrameKind::SignOff),
            other => Err(ProtocolError::UnknownFrame(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlapPacket {
    pub frame: FrameKind,
    pub sequence: u16,
    pub data: Vec<u8>,
}

impl FlapPacket {
    pub fn new(frame: FrameKind, sequence: u16, data: Vec<u8>) -> Self {
        Self {
            frame,
            sequence,
            data,
        }
    }

    /// Data frame wrapping an encoded SNAC.
    pub fn data(sequence: u16, msg: &SnacMessage) -> Result<Self> {
        ensure_fits(msg.encoded_len())?;
        Ok(Self::new(FrameKind::Data, sequence, snac::encode(msg)))
    }

    /// The greeting both listeners send on accept.
    pub fn sign_on_greeting(sequence: u16) -> Self {
        Self::new(FrameKind::SignOn, sequence, FLAP_VERSION.to_vec())
    }

    /// Sign-off frame carrying a TLV list.
    pub fn sign_off(sequence: u16, tlvs: &[Tlv]) -> Result<Self> {
        let data = tlv::encode_all(tlvs)?;
        ensure_fits(data.len())?;
        Ok(Self::new(FrameKind::SignOff, sequence, data))
    }

    /// Length written into the header. Fails for payloads past
    /// [`MAX_FLAP_DATA_LEN`].
    pub fn data_length(&self) -> Result<u16> {
        u16::try_from(self.data.len()).map_err(|_| ProtocolError::OversizedPacket(self.data.len()))
    }

    pub fn encoded_len(&self) -> usize {
        FLAP_HEADER_LEN + self.data.len()
    }

    /// Parse the payload of a data frame as a SNAC.
    pub fn snac(&self) -> Result<SnacMessage> {
        snac::decode(&self.data)
    }

    /// TLVs of a sign-on frame, after the 4-byte FLAP version.
    pub fn sign_on_tlvs(&self) -> Result<Vec<Tlv>> {
        match self.data.get(FLAP_VERSION.len()..) {
            Some(rest) => tlv::decode_all(rest),
            None => Err(ProtocolError::TruncatedHeader),
        }
    }
}

/// Check that a payload of `len` bytes fits the 16-bit length field.
pub(crate) fn ensure_fits(len: usize) -> Result<()> {
    if len > MAX_FLAP_DATA_LEN {
        return Err(ProtocolError::OversizedPacket(len));
    }
    Ok(())
}

/// Validate the header at the start of `buf`.
///
/// Returns `Ok(None)` when the header or payload is not fully available yet.
/// Marker and frame kind are checked as soon as their bytes are present.
pub(crate) fn peek_header(buf: &[u8]) -> Result<Option<(FrameKind, u16, usize)>> {
    if let Some(&marker) = buf.first() {
        if marker != FLAP_MARKER {
            return Err(ProtocolError::InvalidMarker(marker));
        }
    }
    if let Some(&frame) = buf.get(1) {
        FrameKind::try_from(frame)?;
    }
    if buf.len() < FLAP_HEADER_LEN {
        return Ok(None);
    }

    let frame = FrameKind::try_from(buf[1])?;
    let sequence = u16::from_be_bytes([buf[2], buf[3]]);
    let length = usize::from(u16::from_be_bytes([buf[4], buf[5]]));

    Ok(Some((frame, sequence, length)))
}

/// Decode every frame in `buf`.
///
/// The scan is all-or-nothing: a bad marker, an unknown frame kind or a
/// truncated header/payload anywhere in the buffer fails the whole call.
pub fn decode_all(buf: &[u8]) -> Result<Vec<FlapPacket>> {
    let mut packets = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let rest = &buf[offset..];
        let (frame, sequence, length) =
            peek_header(rest)?.ok_or(ProtocolError::TruncatedHeader)?;

        let available = rest.len() - FLAP_HEADER_LEN;
        if length > available {
            return Err(ProtocolError::TruncatedPayload {
                expected: length,
                available,
            });
        }

        packets.push(FlapPacket {
            frame,
            sequence,
            data: rest[FLAP_HEADER_LEN..FLAP_HEADER_LEN + length].to_vec(),
        });
        offset += FLAP_HEADER_LEN + length;
    }

    Ok(packets)
}

pub fn encode(packet: &FlapPacket) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(packet.encoded_len());
    encode_into(packet, &mut buf)?;
    Ok(buf.to_vec())
}

/// Write `packet` into `buf`. The length field is recomputed from the payload;
/// an oversized payload leaves `buf` untouched.
pub fn encode_into(packet: &FlapPacket, buf: &mut BytesMut) -> Result<()> {
    let length = packet.data_length()?;
    buf.reserve(packet.encoded_len());
    buf.put_u8(FLAP_MARKER);
    buf.put_u8(packet.frame as u8);
    buf.put_u16(packet.sequence);
    buf.put_u16(length);
    buf.put_slice(&packet.data);
    Ok(())
}
