//! Password verification schemes.
//!
//! Two legacy schemes coexist and are selected by how the client signs on:
//! - [`ChallengeDigest`]: BUCP challenge/response. The client sends an MD5 over
//!   the challenge, the password (plain or pre-hashed) and a fixed salt.
//! - [`RoastedPassword`]: direct FLAP sign-on. The client XORs the plaintext
//!   password against a fixed 16-byte table.

use md5::{Digest, Md5};

/// Salt appended to every BUCP password digest.
pub const AIM_SALT: &[u8] = b"AOL Instant Messenger (SM)";

/// XOR table used to roast passwords on direct sign-on.
pub const ROAST_TABLE: [u8; 16] = [
    0xF3, 0x26, 0x81, 0xC4, 0x39, 0x86, 0xDB, 0x92, 0x71, 0xA3, 0xB9, 0xE6, 0x53, 0x7A, 0x95, 0x7C,
];

/// A way of checking a submitted credential against a stored plaintext password.
pub trait PasswordScheme {
    fn verify(&self, submitted: &[u8], stored_password: &str) -> bool;
}

fn md5(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// BUCP challenge/response digest.
///
/// Older clients hash the password directly; newer ones hash `MD5(password)`.
/// Either form is accepted.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeDigest<'a> {
    challenge: &'a [u8],
}

impl<'a> ChallengeDigest<'a> {
    pub fn new(challenge: &'a [u8]) -> Self {
        Self { challenge }
    }

    /// `MD5(challenge || password || salt)`
    pub fn old_style(&self, password: &str) -> [u8; 16] {
        md5(&[self.challenge, password.as_bytes(), AIM_SALT])
    }

    /// `MD5(challenge || MD5(password) || salt)`
    pub fn new_style(&self, password: &str) -> [u8; 16] {
        let hashed = md5(&[password.as_bytes()]);
        md5(&[self.challenge, &hashed, AIM_SALT])
    }
}

impl PasswordScheme for ChallengeDigest<'_> {
    fn verify(&self, submitted: &[u8], stored_password: &str) -> bool {
        submitted == self.old_style(stored_password) || submitted == self.new_style(stored_password)
    }
}

/// Direct sign-on XOR obfuscation. No hashing is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoastedPassword;

impl RoastedPassword {
    /// XOR against the repeating table. Roasting is its own inverse.
    pub fn roast(bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .zip(ROAST_TABLE.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }

    pub fn unroast(bytes: &[u8]) -> Vec<u8> {
        Self::roast(bytes)
    }
}

impl PasswordScheme for RoastedPassword {
    fn verify(&self, submitted: &[u8], stored_password: &str) -> bool {
        Self::unroast(submitted) == stored_password.as_bytes()
    }
}
