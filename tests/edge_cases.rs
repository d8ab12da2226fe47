#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the wire codecs, registry limits and handler plumbing

use bytes::BytesMut;
use oscar_protocol::core::codec::FlapCodec;
use oscar_protocol::core::flap::{self, FlapPacket, FrameKind, FLAP_VERSION, MAX_FLAP_DATA_LEN};
use oscar_protocol::core::snac::{self, SnacMessage};
use oscar_protocol::core::tlv::{self, Tlv};
use oscar_protocol::error::ProtocolError;
use oscar_protocol::protocol::{Dispatcher, HandlerFuture, Services};
use oscar_protocol::session::{BosCookie, SessionContext, SessionRegistry};
use oscar_protocol::{AccountError, AccountIdentity, AccountStore, MemoryAccountStore, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::codec::Decoder;

fn account(uin: u32, name: &str) -> AccountIdentity {
    AccountIdentity {
        uin,
        display_name: name.to_string(),
        email: format!("{name}@example.com"),
        password: "secret".to_string(),
    }
}

fn authenticated(sequence: u16) -> SessionContext {
    let mut ctx = SessionContext::with_sequence(sequence);
    ctx.authenticate(account(u32::from(sequence), "user"), BosCookie::generate().unwrap());
    ctx
}

// ============================================================================
// FLAP EDGE CASES
// ============================================================================

#[test]
fn test_flap_empty_buffer() {
    assert!(flap::decode_all(&[]).unwrap().is_empty());
}

#[test]
fn test_flap_empty_payload() {
    let bytes = flap::encode(&FlapPacket::new(FrameKind::SignOff, 0, vec![])).unwrap();
    assert_eq!(bytes, vec![0x2A, 0x04, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(flap::decode_all(&bytes).unwrap()[0].data.len(), 0);
}

#[test]
fn test_flap_max_payload() {
    let packet = FlapPacket::new(FrameKind::Data, 0xFFFF, vec![0xAB; MAX_FLAP_DATA_LEN]);
    let bytes = flap::encode(&packet).unwrap();
    assert_eq!(&bytes[2..6], &[0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(flap::decode_all(&bytes).unwrap(), vec![packet]);
}

#[test]
fn test_flap_valid_frame_then_partial_tail() {
    let mut bytes = flap::encode(&FlapPacket::sign_on_greeting(1)).unwrap();
    bytes.extend_from_slice(&[0x2A, 0x02, 0x00]);

    assert!(matches!(
        flap::decode_all(&bytes),
        Err(ProtocolError::TruncatedHeader)
    ));
}

#[test]
fn test_flap_frame_kind_zero_rejected() {
    assert!(matches!(
        flap::decode_all(&[0x2A, 0x00, 0x00, 0x00, 0x00, 0x00]),
        Err(ProtocolError::UnknownFrame(0x00))
    ));
}

#[test]
fn test_codec_fails_fast_on_bad_marker() {
    let mut codec = FlapCodec;
    let mut buf = BytesMut::from(&[0x00u8][..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::InvalidMarker(0x00))
    ));
}

#[test]
fn test_codec_eof_with_dangling_tail() {
    let mut codec = FlapCodec;
    let mut buf = BytesMut::from(&[0x2A, 0x02, 0x00, 0x01, 0x00, 0x08, 0x01][..]);
    assert!(codec.decode(&mut buf).unwrap().is_none());
    assert!(matches!(
        codec.decode_eof(&mut buf),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[test]
fn test_codec_two_frames_in_one_read() {
    let mut codec = FlapCodec;
    let mut bytes = flap::encode(&FlapPacket::new(FrameKind::Data, 1, vec![1])).unwrap();
    bytes.extend(flap::encode(&FlapPacket::new(FrameKind::Data, 2, vec![2])).unwrap());
    let mut buf = BytesMut::from(&bytes[..]);

    assert_eq!(codec.decode(&mut buf).unwrap().unwrap().sequence, 1);
    assert_eq!(codec.decode(&mut buf).unwrap().unwrap().sequence, 2);
    assert!(codec.decode(&mut buf).unwrap().is_none());
}

#[test]
fn test_sign_on_exactly_version() {
    let packet = FlapPacket::new(FrameKind::SignOn, 1, FLAP_VERSION.to_vec());
    assert!(packet.sign_on_tlvs().unwrap().is_empty());
}

// ============================================================================
// SNAC / TLV EDGE CASES
// ============================================================================

#[test]
fn test_snac_exact_header() {
    let msg = snac::decode(&[0x00, 0x17, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A]).unwrap();
    assert_eq!(msg.key(), (0x0017, 0x0006));
    assert_eq!(msg.request_id, 0x2A);
    assert!(msg.data.is_empty());
}

#[test]
fn test_snac_nine_bytes_rejected() {
    assert!(matches!(
        snac::decode(&[0u8; 9]),
        Err(ProtocolError::TruncatedHeader)
    ));
}

#[test]
fn test_snac_with_garbage_tlvs() {
    let msg = SnacMessage::new(0x0017, 0x0006, vec![0x00, 0x01, 0x00, 0x10, b'a']);
    let err = msg.tlvs().unwrap_err();
    assert!(err.is_malformed_message());
}

#[test]
fn test_tlv_zero_length_value() {
    let bytes = tlv::encode(&Tlv::new(0x0003, Vec::new())).unwrap();
    assert_eq!(bytes, vec![0x00, 0x03, 0x00, 0x00]);
    let (decoded, consumed) = tlv::decode_one(&bytes).unwrap();
    assert_eq!(consumed, 4);
    assert!(decoded.value.is_empty());
}

#[test]
fn test_tlv_value_u16_wrong_width() {
    assert_eq!(Tlv::new(0x0008, vec![0x05]).value_u16(), None);
    assert_eq!(Tlv::new(0x0008, vec![0x00, 0x05, 0x00]).value_u16(), None);
}

#[test]
fn test_tlv_invalid_utf8_is_lossy() {
    let tlv = Tlv::new(0x0001, vec![b'a', 0xFF, b'b']);
    assert_eq!(tlv.value_lossy(), "a\u{FFFD}b");
}

// ============================================================================
// ACCOUNT STORE EDGE CASES
// ============================================================================

#[test]
fn test_account_lookup_ignores_case_and_spaces() {
    let store = MemoryAccountStore::new();
    store.insert(account(5, "Jane Doe")).unwrap();

    assert_eq!(store.lookup_account_by_display_name("janedoe").unwrap().uin, 5);
    assert_eq!(store.lookup_account_by_display_name("JANE DOE").unwrap().uin, 5);
    assert!(matches!(
        store.lookup_account_by_display_name("jane"),
        Err(AccountError::NotFound(_))
    ));
}

#[test]
fn test_account_without_profile() {
    let store = MemoryAccountStore::new();
    store.insert_without_profile(account(9, "ghost")).unwrap();

    assert!(store.lookup_account_by_display_name("ghost").is_ok());
    assert_eq!(store.lookup_user_by_uin(9), Err(AccountError::UserNotFound(9)));
}

#[test]
fn test_account_with_profile() {
    let store = MemoryAccountStore::new();
    let profile = UserProfile {
        uin: 3,
        signup_date: 946_684_800,
        last_login: 0,
        status_message: "away".to_string(),
    };
    store.insert_with_profile(account(3, "bob"), profile.clone()).unwrap();
    assert_eq!(store.lookup_user_by_uin(3).unwrap(), profile);
}

// ============================================================================
// REGISTRY EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_registry_rejects_unauthenticated_context() {
    let registry = SessionRegistry::default();
    let result = registry.publish(SessionContext::with_sequence(0)).await;
    assert!(matches!(result, Err(ProtocolError::NotAuthenticated)));
}

#[tokio::test]
async fn test_registry_duplicate_cookie() {
    let registry = SessionRegistry::default();
    let ctx = authenticated(1);
    registry.publish(ctx.clone()).await.unwrap();

    assert!(matches!(
        registry.publish(ctx).await,
        Err(ProtocolError::DuplicateCookie)
    ));
}

#[tokio::test]
async fn test_registry_evicts_oldest_when_full() {
    let registry = SessionRegistry::new(2, Duration::from_secs(60));
    let first = authenticated(1);
    let first_cookie = first.bos_cookie().unwrap().clone();

    registry.publish(first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    registry.publish(authenticated(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    registry.publish(authenticated(3)).await.unwrap();

    assert_eq!(registry.len().await, 2);
    assert!(registry.claim(first_cookie.as_bytes()).await.is_none());
    assert_eq!(registry.stats().await.total_evicted, 1);
}

#[tokio::test]
async fn test_registry_expired_cookie_is_miss() {
    let registry = SessionRegistry::new(10, Duration::from_millis(20));
    let ctx = authenticated(1);
    let cookie = ctx.bos_cookie().unwrap().clone();
    registry.publish(ctx).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.claim(cookie.as_bytes()).await.is_none());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_registry_prefix_of_cookie_is_miss() {
    let registry = SessionRegistry::default();
    let ctx = authenticated(1);
    let cookie = ctx.bos_cookie().unwrap().clone();
    registry.publish(ctx).await.unwrap();

    assert!(registry.claim(&cookie.as_bytes()[..255]).await.is_none());
    assert!(registry.claim(&[]).await.is_none());
    assert!(registry.claim(cookie.as_bytes()).await.is_some());
}

// ============================================================================
// DISPATCHER EDGE CASES
// ============================================================================

fn answer<'a>(
    session: &'a mut SessionContext,
    _services: &'a Services,
    msg: SnacMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let reply = SnacMessage::new(msg.foodgroup, msg.subgroup + 1, msg.data);
        Ok(vec![FlapPacket::data(session.next_server_sequence(), &reply)?])
    })
}

fn fail<'a>(
    _session: &'a mut SessionContext,
    _services: &'a Services,
    _msg: SnacMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move { Err(ProtocolError::NotAuthenticated) })
}

fn services() -> Services {
    Services::new(
        Arc::new(MemoryAccountStore::new()),
        Default::default(),
        SessionRegistry::default(),
    )
}

#[tokio::test]
async fn test_dispatcher_handler_override() {
    let dispatcher = Dispatcher::new();
    dispatcher.register(0x0004, 0x0006, fail).unwrap();
    dispatcher.register(0x0004, 0x0006, answer).unwrap();

    let services = services();
    let mut session = SessionContext::with_sequence(0);
    let frames = dispatcher
        .dispatch(&mut session, &services, SnacMessage::new(0x0004, 0x0006, vec![]))
        .await
        .unwrap();
    assert_eq!(frames[0].snac().unwrap().subgroup, 0x0007);
}

#[tokio::test]
async fn test_dispatcher_handler_error_propagates() {
    let dispatcher = Dispatcher::new();
    dispatcher.register(0x0004, 0x0006, fail).unwrap();

    let services = services();
    let mut session = SessionContext::with_sequence(0);
    let result = dispatcher
        .dispatch(&mut session, &services, SnacMessage::new(0x0004, 0x0006, vec![]))
        .await;
    assert!(matches!(result, Err(ProtocolError::NotAuthenticated)));
}

#[test]
fn test_dispatcher_clone_shares_table() {
    let dispatcher = Dispatcher::new();
    let clone = dispatcher.clone();
    dispatcher.register(0x0013, 0x0004, answer).unwrap();
    assert!(clone.is_registered(0x0013, 0x0004));
    assert!(!clone.is_registered(0x0013, 0x0005));
}

// ============================================================================
// ERROR FORMATTING
// ============================================================================

#[test]
fn test_error_display_formatting() {
    assert_eq!(
        ProtocolError::InvalidMarker(0x2B).to_string(),
        "Invalid FLAP marker: 0x2B"
    );
    assert_eq!(
        ProtocolError::MissingTlv(0x0025).to_string(),
        "Required TLV 0x0025 missing"
    );
    assert!(ProtocolError::from(AccountError::NotFound("zed".into()))
        .to_string()
        .contains("zed"));
}
