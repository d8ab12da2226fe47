//! BOS hand-off: claiming a pending session and announcing the host.

use bytes::{BufMut, BytesMut};
use tracing::{info, instrument, warn};

use crate::core::flap::FlapPacket;
use crate::core::snac::SnacMessage;
use crate::core::tlv;
use crate::error::{ProtocolError, Result};
use crate::protocol::foodgroup::{self, oservice, tag, SUPPORTED_FOODGROUPS};
use crate::protocol::Services;
use crate::session::SessionContext;

/// `OSERVICE/HostOnline` listing every supported foodgroup as a big-endian u16.
pub fn host_online() -> SnacMessage {
    let mut data = BytesMut::with_capacity(SUPPORTED_FOODGROUPS.len() * 2);
    for code in SUPPORTED_FOODGROUPS {
        data.put_u16(code);
    }
    SnacMessage::new(foodgroup::OSERVICE, oservice::HOST_ONLINE, data.to_vec())
}

/// Handle the first frame on a BOS connection.
///
/// On a cookie match the claimed context replaces `session`, keeping the
/// sequence counter from the login connection, and `HostOnline` is returned.
/// On a miss `session` is left untouched and [`ProtocolError::RegistryMiss`]
/// is returned.
#[instrument(skip_all)]
pub async fn claim_session(
    session: &mut SessionContext,
    services: &Services,
    packet: &FlapPacket,
) -> Result<Vec<FlapPacket>> {
    let tlvs = packet.sign_on_tlvs()?;
    let cookie = tlv::require(&tlvs, tag::BOS_COOKIE)?;

    let Some(claimed) = services.registry.claim(&cookie.value).await else {
        warn!(cookie_len = cookie.value.len(), "BOS cookie matched no pending session");
        services.metrics.registry_miss();
        return Err(ProtocolError::RegistryMiss);
    };

    *session = claimed;
    services.metrics.session_claimed();
    info!(
        uin = session.account().map(|a| a.uin),
        screen_name = session.display_name().unwrap_or_default(),
        "Session claimed on BOS"
    );

    Ok(vec![FlapPacket::data(
        session.next_server_sequence(),
        &host_online(),
    )?])
}
