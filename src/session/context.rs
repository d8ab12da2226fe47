//! Per-connection protocol state.
//!
//! A context starts out awaiting a challenge, holds a challenge nonce between
//! the challenge and login requests, and holds a BOS cookie once login
//! succeeds. The two credentials live in one enum so a context can never carry
//! both at once.

use std::fmt;

use crate::account::AccountIdentity;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::random;

/// Length of the BUCP challenge nonce.
pub const CHALLENGE_LEN: usize = 56;

/// Length of an issued BOS cookie.
pub const BOS_COOKIE_LEN: usize = 256;

/// Opaque token handed to the client at login and presented to the BOS listener.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BosCookie(Vec<u8>);

impl BosCookie {
    pub fn generate() -> Result<Self> {
        random::bytes::<BOS_COOKIE_LEN>()
            .map(|bytes| Self(bytes.to_vec()))
            .map_err(|e| ProtocolError::Random(format!("{}: {e}", constants::ERR_COOKIE_RNG)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BosCookie {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// Cookies are bearer credentials; keep them out of logs.
impl fmt::Debug for BosCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BosCookie({} bytes)", self.0.len())
    }
}

#[derive(Clone, PartialEq, Eq)]
enum Credential {
    None,
    Challenge([u8; CHALLENGE_LEN]),
    Cookie(BosCookie),
}

/// Where a context is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    AwaitingChallenge,
    ChallengeIssued,
    Authenticated,
}

#[derive(Clone)]
pub struct SessionContext {
    server_sequence: u16,
    client_sequence: u16,
    credential: Credential,
    display_name: Option<String>,
    account: Option<AccountIdentity>,
}

impl SessionContext {
    /// Fresh context with a random starting sequence.
    pub fn new() -> Self {
        Self::with_sequence(random::sequence())
    }

    pub fn with_sequence(server_sequence: u16) -> Self {
        Self {
            server_sequence,
            client_sequence: 0,
            credential: Credential::None,
            display_name: None,
            account: None,
        }
    }

    /// Advance the server sequence (wrapping 65535 -> 0) and return it.
    /// Called once immediately before every frame the server sends.
    pub fn next_server_sequence(&mut self) -> u16 {
        self.server_sequence = self.server_sequence.wrapping_add(1);
        self.server_sequence
    }

    pub fn server_sequence(&self) -> u16 {
        self.server_sequence
    }

    /// Recorded for diagnostics; client sequences are not validated.
    pub fn observe_client_sequence(&mut self, sequence: u16) {
        self.client_sequence = sequence;
    }

    pub fn client_sequence(&self) -> u16 {
        self.client_sequence
    }

    pub fn phase(&self) -> AuthPhase {
        match self.credential {
            Credential::None => AuthPhase::AwaitingChallenge,
            Credential::Challenge(_) => AuthPhase::ChallengeIssued,
            Credential::Cookie(_) => AuthPhase::Authenticated,
        }
    }

    /// Generate and store a new challenge, replacing any previous one.
    pub fn issue_challenge(&mut self) -> Result<[u8; CHALLENGE_LEN]> {
        let challenge = random::bytes::<CHALLENGE_LEN>().map_err(|e| {
            ProtocolError::Random(format!("{}: {e}", constants::ERR_CHALLENGE_RNG))
        })?;
        self.credential = Credential::Challenge(challenge);
        Ok(challenge)
    }

    pub fn challenge(&self) -> Option<&[u8; CHALLENGE_LEN]> {
        match &self.credential {
            Credential::Challenge(c) => Some(c),
            _ => None,
        }
    }

    /// Drop any outstanding challenge so the next login needs a fresh one.
    pub fn clear_challenge(&mut self) {
        if matches!(self.credential, Credential::Challenge(_)) {
            self.credential = Credential::None;
        }
    }

    /// Mark the context authenticated. Consumes the challenge.
    pub fn authenticate(&mut self, account: AccountIdentity, cookie: BosCookie) {
        self.credential = Credential::Cookie(cookie);
        self.display_name = Some(account.display_name.clone());
        self.account = Some(account);
    }

    pub fn bos_cookie(&self) -> Option<&BosCookie> {
        match &self.credential {
            Credential::Cookie(c) => Some(c),
            _ => None,
        }
    }

    pub fn remember_display_name(&mut self, name: impl Into<String>) {
        self.display_name = Some(name.into());
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn account(&self) -> Option<&AccountIdentity> {
        self.account.as_ref()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("server_sequence", &self.server_sequence)
            .field("client_sequence", &self.client_sequence)
            .field("phase", &self.phase())
            .field("display_name", &self.display_name)
            .field("uin", &self.account.as_ref().map(|a| a.uin))
            .finish()
    }
}
