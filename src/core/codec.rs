//! Tokio codec for FLAP frames over a byte stream.
//!
//! Unlike [`flap::decode_all`], the codec keeps unconsumed trailing bytes in
//! the read buffer until the rest of the frame arrives, so a frame split
//! across socket reads is reassembled instead of killing the connection.
//! Corrupt bytes (bad marker, unknown frame kind) still fail immediately.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::flap::{self, FlapPacket, FLAP_HEADER_LEN};
use crate::error::ProtocolError;

#[derive(Debug, Default, Clone, Copy)]
pub struct FlapCodec;

impl Decoder for FlapCodec {
    type Item = FlapPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((frame, sequence, length)) = flap::peek_header(src)? else {
            return Ok(None);
        };

        let total = FLAP_HEADER_LEN + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FLAP_HEADER_LEN);
        let data = src.split_to(length).to_vec();

        Ok(Some(FlapPacket {
            frame,
            sequence,
            data,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }
}

impl Encoder<FlapPacket> for FlapCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: FlapPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        flap::encode_into(&item, dst)
    }
}
