//! Per-connection read/dispatch loop shared by both listeners.
//!
//! The driver owns the [`SessionContext`], reads frames through
//! [`FlapCodec`], routes them by frame kind and writes every reply in order
//! from the same task. A framing error or a sign-off (either direction) ends
//! the connection; a bad message only drops that message.

use std::fmt;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, instrument, trace, warn};

use crate::core::codec::FlapCodec;
use crate::core::flap::{FlapPacket, FrameKind};
use crate::core::tlv;
use crate::error::{ProtocolError, Result};
use crate::protocol::foodgroup::tag;
use crate::protocol::{bucp, oservice, Dispatcher, Services};
use crate::session::{AuthPhase, SessionContext};

/// Which listener a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// Login listener: BUCP exchange or direct sign-on.
    Bucp,
    /// Service listener: cookie claim, then normal traffic.
    Bos,
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerRole::Bucp => f.write_str("bucp"),
            ListenerRole::Bos => f.write_str("bos"),
        }
    }
}

/// Drive one connection until the peer disconnects, signs off, or sends a
/// malformed frame.
pub async fn serve_connection<S>(
    stream: S,
    role: ListenerRole,
    services: Services,
    dispatcher: Dispatcher,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    services.metrics.connection_established();
    let result = drive(stream, role, &services, &dispatcher).await;
    services.metrics.connection_closed();
    result
}

#[instrument(skip_all, fields(role = %role))]
async fn drive<S>(
    stream: S,
    role: ListenerRole,
    services: &Services,
    dispatcher: &Dispatcher,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, FlapCodec);
    let mut session = SessionContext::new();

    let greeting = FlapPacket::sign_on_greeting(session.next_server_sequence());
    send(&mut framed, services, greeting).await?;

    while let Some(next) = framed.next().await {
        let packet = match next {
            Ok(packet) => packet,
            Err(e) if e.is_malformed_frame() => {
                services.metrics.framing_error();
                warn!(error = %e, "Closing connection on framing error");
                return Err(e);
            }
            Err(e) => {
                debug!(error = %e, "Connection lost");
                return Err(e);
            }
        };

        services.metrics.frame_received();
        session.observe_client_sequence(packet.sequence);
        trace!(frame = ?packet.frame, sequence = packet.sequence, len = packet.data.len(), "Frame received");

        let replies = match packet.frame {
            FrameKind::SignOn => handle_sign_on(role, &mut session, services, &packet).await,
            FrameKind::Data => handle_data(role, &mut session, services, dispatcher, packet).await,
            FrameKind::SignOff => {
                debug!("Client signed off");
                return Ok(());
            }
            FrameKind::Error => {
                debug!(len = packet.data.len(), "Ignoring client error frame");
                continue;
            }
        };

        let replies = match replies {
            Ok(replies) => replies,
            Err(e) => {
                drop_message(services, &e);
                continue;
            }
        };

        let mut signed_off = false;
        for reply in replies {
            let frame = reply.frame;
            match send(&mut framed, services, reply).await {
                Ok(()) => signed_off |= frame == FrameKind::SignOff,
                Err(e @ ProtocolError::OversizedPacket(_)) => drop_message(services, &e),
                Err(e) => return Err(e),
            }
        }

        if signed_off {
            debug!("Sign-off sent, closing connection");
            return Ok(());
        }
    }

    debug!("Peer disconnected");
    Ok(())
}

async fn handle_sign_on(
    role: ListenerRole,
    session: &mut SessionContext,
    services: &Services,
    packet: &FlapPacket,
) -> Result<Vec<FlapPacket>> {
    match role {
        ListenerRole::Bucp if carries_credentials(packet) => {
            bucp::handle_direct_sign_on(session, services, packet).await
        }
        ListenerRole::Bucp => Ok(Vec::new()),
        ListenerRole::Bos if session.phase() == AuthPhase::Authenticated => Ok(Vec::new()),
        ListenerRole::Bos => oservice::claim_session(session, services, packet).await,
    }
}

async fn handle_data(
    role: ListenerRole,
    session: &mut SessionContext,
    services: &Services,
    dispatcher: &Dispatcher,
    packet: FlapPacket,
) -> Result<Vec<FlapPacket>> {
    if role == ListenerRole::Bos && session.phase() != AuthPhase::Authenticated {
        return Err(ProtocolError::NotAuthenticated);
    }

    let msg = packet.snac()?;
    trace!(foodgroup = msg.foodgroup, subgroup = msg.subgroup, "Dispatching SNAC");
    dispatcher.dispatch(session, services, msg).await
}

/// A sign-on frame is a direct login when it carries a roasted password.
fn carries_credentials(packet: &FlapPacket) -> bool {
    packet
        .sign_on_tlvs()
        .map(|tlvs| tlv::find(&tlvs, tag::ROASTED_PASSWORD).is_some())
        .unwrap_or(false)
}

fn drop_message(services: &Services, error: &ProtocolError) {
    services.metrics.message_dropped();
    match error {
        e if e.is_malformed_message() => debug!(error = %e, "Dropped malformed message"),
        ProtocolError::UnexpectedMessage => debug!("Dropped unhandled SNAC"),
        e => warn!(error = %e, "Message produced no response"),
    }
}

async fn send<S>(
    framed: &mut Framed<S, FlapCodec>,
    services: &Services,
    packet: FlapPacket,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    framed.send(packet).await?;
    services.metrics.frame_sent();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::flap;
    use crate::core::snac::SnacMessage;
    use crate::protocol::dispatcher::HandlerFuture;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_greeting_then_bad_marker_closes() {
        let services = Services::for_tests();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(serve_connection(
            server,
            ListenerRole::Bucp,
            services.clone(),
            Dispatcher::new(),
        ));

        let mut greeting = [0u8; 10];
        client.read_exact(&mut greeting).await.unwrap();
        let frames = flap::decode_all(&greeting).unwrap();
        assert_eq!(frames[0].frame, FrameKind::SignOn);
        assert_eq!(frames[0].data, vec![0, 0, 0, 1]);

        client.write_all(&[0x2B, 0x02, 0, 0, 0, 0]).await.unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(ProtocolError::InvalidMarker(0x2B))));

        let snapshot = services.metrics.snapshot();
        assert_eq!(snapshot.framing_errors, 1);
        assert_eq!(snapshot.connections_active, 0);
    }

    #[tokio::test]
    async fn test_client_sign_off_ends_connection() {
        let services = Services::for_tests();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(serve_connection(
            server,
            ListenerRole::Bos,
            services,
            Dispatcher::new(),
        ));

        let mut greeting = [0u8; 10];
        client.read_exact(&mut greeting).await.unwrap();
        client
            .write_all(&flap::encode(&FlapPacket::new(FrameKind::SignOff, 1, vec![])).unwrap())
            .await
            .unwrap();

        assert!(task.await.unwrap().is_ok());
    }

    fn oversized_then_echo<'a>(
        session: &'a mut SessionContext,
        _services: &'a Services,
        msg: SnacMessage,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let oversized = FlapPacket::new(FrameKind::Data, 0, vec![0; 70_000]);
            let echo = FlapPacket::data(session.next_server_sequence(), &msg)?;
            Ok(vec![oversized, echo])
        })
    }

    #[tokio::test]
    async fn test_unencodable_reply_is_dropped() {
        let services = Services::for_tests();
        let dispatcher = Dispatcher::new();
        dispatcher.register(0x0004, 0x0006, oversized_then_echo).unwrap();

        let (client, server) = duplex(1 << 16);
        let task = tokio::spawn(serve_connection(
            server,
            ListenerRole::Bucp,
            services.clone(),
            dispatcher,
        ));
        let mut client = Framed::new(client, FlapCodec);

        let greeting = client.next().await.unwrap().unwrap();
        assert_eq!(greeting.frame, FrameKind::SignOn);

        let msg = SnacMessage::new(0x0004, 0x0006, vec![7]);
        client.send(FlapPacket::data(1, &msg).unwrap()).await.unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.snac().unwrap(), msg);

        drop(client);
        assert!(task.await.unwrap().is_ok());

        let snapshot = services.metrics.snapshot();
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.framing_errors, 0);
    }

    #[tokio::test]
    async fn test_peer_closing_mid_frame_is_not_a_framing_error() {
        let services = Services::for_tests();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(serve_connection(
            server,
            ListenerRole::Bucp,
            services.clone(),
            Dispatcher::new(),
        ));

        let mut greeting = [0u8; 10];
        client.read_exact(&mut greeting).await.unwrap();
        client.write_all(&[0x2A, 0x02, 0x00]).await.unwrap();
        drop(client);

        assert!(matches!(
            task.await.unwrap(),
            Err(ProtocolError::ConnectionClosed)
        ));
        assert_eq!(services.metrics.snapshot().framing_errors, 0);
    }

    #[test]
    fn test_plain_sign_on_is_not_direct_login() {
        let hello = FlapPacket::sign_on_greeting(1);
        assert!(!carries_credentials(&hello));
    }
}
