//! # Account Collaborator
//!
//! Account persistence is owned by the embedding application. The protocol
//! core only needs two lookups, expressed by [`AccountStore`].
//!
//! [`MemoryAccountStore`] is a thread-safe in-memory implementation used by the
//! bundled server binary and by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric user identifier.
pub type Uin = u32;

/// Identity resolved during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub uin: Uin,
    pub display_name: String,
    pub email: String,
    /// Stored plaintext password. Both legacy verification schemes need it.
    pub password: String,
}

/// Profile details keyed by UIN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub uin: Uin,
    pub signup_date: i64,
    pub last_login: i64,
    pub status_message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("account not found: {0}")]
    NotFound(String),

    #[error("user profile not found for UIN {0}")]
    UserNotFound(Uin),

    #[error("account backend error: {0}")]
    Backend(String),
}

/// Lookups the authentication state machine performs.
pub trait AccountStore: Send + Sync {
    fn lookup_account_by_display_name(
        &self,
        display_name: &str,
    ) -> Result<AccountIdentity, AccountError>;

    fn lookup_user_by_uin(&self, uin: Uin) -> Result<UserProfile, AccountError>;
}

/// In-memory account table.
///
/// Display names are matched case-insensitively with spaces ignored, which is
/// how AIM screen names compare.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, AccountIdentity>>,
    profiles: RwLock<HashMap<Uin, UserProfile>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account together with a default profile.
    pub fn insert(&self, account: AccountIdentity) -> Result<(), AccountError> {
        let profile = UserProfile {
            uin: account.uin,
            ..UserProfile::default()
        };
        self.insert_with_profile(account, profile)
    }

    pub fn insert_with_profile(
        &self,
        account: AccountIdentity,
        profile: UserProfile,
    ) -> Result<(), AccountError> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| AccountError::Backend("profile table poisoned".into()))?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AccountError::Backend("account table poisoned".into()))?;

        profiles.insert(account.uin, profile);
        accounts.insert(normalize(&account.display_name), account);
        Ok(())
    }

    /// Register an account without a profile. Logins for it fail at the
    /// profile lookup step.
    pub fn insert_without_profile(&self, account: AccountIdentity) -> Result<(), AccountError> {
        self.accounts
            .write()
            .map_err(|_| AccountError::Backend("account table poisoned".into()))?
            .insert(normalize(&account.display_name), account);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccountStore for MemoryAccountStore {
    fn lookup_account_by_display_name(
        &self,
        display_name: &str,
    ) -> Result<AccountIdentity, AccountError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::Backend("account table poisoned".into()))?;

        accounts
            .get(&normalize(display_name))
            .cloned()
            .ok_or_else(|| AccountError::NotFound(display_name.to_string()))
    }

    fn lookup_user_by_uin(&self, uin: Uin) -> Result<UserProfile, AccountError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| AccountError::Backend("profile table poisoned".into()))?;

        profiles
            .get(&uin)
            .cloned()
            .ok_or(AccountError::UserNotFound(uin))
    }
}

pub(crate) fn normalize(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
