//! BUCP authentication state machine.
//!
//! ```text
//! AwaitingChallenge --ChallengeRequest--> ChallengeIssued --LoginRequest(ok)--> Authenticated
//!         ^                                      |
//!         +--------------LoginRequest(bad)-------+
//! ```
//!
//! Malformed requests, logins without a challenge and failed account lookups
//! produce no reply at all; the driver logs the returned error and moves on.

use bytes::{BufMut, BytesMut};
use tracing::{debug, info, instrument, trace, warn};

use crate::core::flap::FlapPacket;
use crate::core::snac::SnacMessage;
use crate::core::tlv::{self, Tlv};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::HandlerFuture;
use crate::protocol::foodgroup::{bucp, error_code, tag};
use crate::protocol::password::{ChallengeDigest, PasswordScheme, RoastedPassword};
use crate::protocol::Services;
use crate::session::{BosCookie, SessionContext, CHALLENGE_LEN};

/// `BUCP/ChallengeRequest`: remember the screen name and issue a fresh challenge.
pub fn handle_challenge_request<'a>(
    session: &'a mut SessionContext,
    services: &'a Services,
    msg: SnacMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let tlvs = msg.tlvs()?;
        let screen_name = tlv::require(&tlvs, tag::SCREEN_NAME)?.value_lossy();

        let challenge = session.issue_challenge()?;
        session.remember_display_name(screen_name.as_str());
        services.metrics.challenge_issued();
        debug!(screen_name = %screen_name, "Challenge issued");

        let mut data = BytesMut::with_capacity(2 + CHALLENGE_LEN);
        data.put_u16(CHALLENGE_LEN as u16);
        data.put_slice(&challenge);

        let reply = SnacMessage::new(msg.foodgroup, bucp::CHALLENGE_RESPONSE, data.to_vec());
        Ok(vec![FlapPacket::data(session.next_server_sequence(), &reply)?])
    })
}

/// `BUCP/LoginRequest`: verify the digest against the outstanding challenge.
///
/// The reply is built before any state changes, so a reply that cannot be
/// encoded leaves the session and registry untouched.
pub fn handle_login_request<'a>(
    session: &'a mut SessionContext,
    services: &'a Services,
    msg: SnacMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let challenge = *session.challenge().ok_or(ProtocolError::ChallengeMissing)?;

        let tlvs = msg.tlvs()?;
        let submitted = tlv::require(&tlvs, tag::PASSWORD_HASH)?;
        let screen_name = match tlv::find(&tlvs, tag::SCREEN_NAME) {
            Some(tlv) => tlv.value_lossy(),
            None => session
                .display_name()
                .map(str::to_owned)
                .ok_or(ProtocolError::MissingTlv(tag::SCREEN_NAME))?,
        };

        let account = services
            .accounts
            .lookup_account_by_display_name(&screen_name)?;
        let profile = services.accounts.lookup_user_by_uin(account.uin)?;
        debug!(
            uin = account.uin,
            signup_date = profile.signup_date,
            "Account resolved"
        );
        trace!(submitted_len = submitted.value.len(), "Verifying BUCP digest");

        let config = &services.config;

        if !ChallengeDigest::new(&challenge).verify(&submitted.value, &account.password) {
            let reply = SnacMessage::with_tlvs(
                msg.foodgroup,
                bucp::LOGIN_RESPONSE,
                &[
                    Tlv::new(tag::SCREEN_NAME, account.display_name.as_bytes()),
                    Tlv::from_u16(tag::ERROR_CODE, error_code::INCORRECT_PASSWORD),
                    Tlv::new(tag::ERROR_URL, config.error_url()),
                    Tlv::new(tag::CHANGE_PASSWORD_URL, config.password_recovery_url()),
                ],
            )?;

            warn!(uin = account.uin, screen_name = %screen_name, "BUCP authentication failed");
            session.clear_challenge();
            services.metrics.login_rejected();
            return Ok(vec![FlapPacket::data(session.next_server_sequence(), &reply)?]);
        }

        let client_id = tlv::find(&tlvs, tag::CLIENT_ID).map(Tlv::value_lossy);
        let cookie = BosCookie::generate()?;
        let reply = SnacMessage::with_tlvs(
            msg.foodgroup,
            bucp::LOGIN_RESPONSE,
            &[
                Tlv::new(tag::SCREEN_NAME, account.display_name.as_bytes()),
                Tlv::new(tag::BOS_ADDRESS, config.bos_endpoint()),
                Tlv::new(tag::BOS_COOKIE, cookie.as_bytes()),
                Tlv::new(tag::EMAIL, account.email.as_bytes()),
                Tlv::new(tag::CHANGE_PASSWORD_URL, config.password_recovery_url()),
            ],
        )?;

        let mut authenticated = session.clone();
        authenticated.authenticate(account, cookie);
        let frame = FlapPacket::data(authenticated.next_server_sequence(), &reply)?;
        services.registry.publish(authenticated.clone()).await?;
        *session = authenticated;
        services.metrics.login_accepted();

        info!(
            uin = session.account().map(|a| a.uin),
            screen_name = session.display_name().unwrap_or_default(),
            client = client_id.as_deref().unwrap_or("unknown"),
            "Client authenticated via BUCP"
        );
        Ok(vec![frame])
    })
}

/// Direct sign-on: credentials arrive in the client's sign-on frame with a
/// roasted password instead of going through the challenge exchange.
///
/// Both outcomes are answered with a sign-off frame. As with BUCP, `session`
/// only changes once the reply is encoded and the context is published.
#[instrument(skip_all)]
pub async fn handle_direct_sign_on(
    session: &mut SessionContext,
    services: &Services,
    packet: &FlapPacket,
) -> Result<Vec<FlapPacket>> {
    let tlvs = packet.sign_on_tlvs()?;
    let screen_name = tlv::require(&tlvs, tag::SCREEN_NAME)?.value_lossy();
    let roasted = tlv::require(&tlvs, tag::ROASTED_PASSWORD)?;

    let account = services
        .accounts
        .lookup_account_by_display_name(&screen_name)?;
    trace!(roasted_len = roasted.value.len(), "Verifying roasted password");

    let config = &services.config;

    if !RoastedPassword.verify(&roasted.value, &account.password) {
        let mut rejected = session.clone();
        let frame = FlapPacket::sign_off(
            rejected.next_server_sequence(),
            &[
                Tlv::new(tag::SCREEN_NAME, account.display_name.as_bytes()),
                Tlv::from_u16(tag::ERROR_CODE, error_code::INVALID_NICK_OR_PASSWORD),
                Tlv::new(tag::ERROR_URL, config.error_url()),
                Tlv::from_u16(tag::UNKNOWN_000C, 0x0000),
            ],
        )?;

        warn!(uin = account.uin, screen_name = %screen_name, "Direct sign-on failed");
        *session = rejected;
        services.metrics.login_rejected();
        return Ok(vec![frame]);
    }

    let client_id = tlv::find(&tlvs, tag::CLIENT_ID).map(Tlv::value_lossy);
    let cookie = BosCookie::generate()?;
    let reply = [
        Tlv::new(tag::SCREEN_NAME, account.display_name.as_bytes()),
        Tlv::new(tag::BOS_ADDRESS, config.bos_endpoint()),
        Tlv::new(tag::BOS_COOKIE, cookie.as_bytes()),
    ];

    let mut authenticated = session.clone();
    authenticated.authenticate(account, cookie);
    let frame = FlapPacket::sign_off(authenticated.next_server_sequence(), &reply)?;
    services.registry.publish(authenticated.clone()).await?;
    *session = authenticated;
    services.metrics.login_accepted();

    info!(
        uin = session.account().map(|a| a.uin),
        screen_name = session.display_name().unwrap_or_default(),
        client = client_id.as_deref().unwrap_or("unknown"),
        "Client authenticated via direct sign-on"
    );
    Ok(vec![frame])
}
