// File: quill-common/src/models/account.rs

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque key identifying one signed-in account, in `user@host` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Credential kinds an account can be signed in with. Only the
/// token-based OAuth family can hold a streaming connection open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    OAuth,
    XAuth,
    Basic,
    Empty,
}

impl CredentialKind {
    pub fn supports_streaming(&self) -> bool {
        matches!(self, CredentialKind::OAuth | CredentialKind::XAuth)
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::OAuth => write!(f, "oauth"),
            CredentialKind::XAuth => write!(f, "xauth"),
            CredentialKind::Basic => write!(f, "basic"),
            CredentialKind::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oauth" => Ok(CredentialKind::OAuth),
            "xauth" => Ok(CredentialKind::XAuth),
            "basic" => Ok(CredentialKind::Basic),
            "empty" => Ok(CredentialKind::Empty),
            _ => Err(format!("Unknown credential kind: {}", s)),
        }
    }
}

/// One account as seen by the account provider at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAccount {
    pub id: AccountId,
    pub screen_name: String,
    pub credential_kind: CredentialKind,
    pub streaming_enabled: bool,
}

impl StreamAccount {
    pub fn new(
        id: AccountId,
        screen_name: impl Into<String>,
        credential_kind: CredentialKind,
        streaming_enabled: bool,
    ) -> Self {
        Self {
            id,
            screen_name: screen_name.into(),
            credential_kind,
            streaming_enabled,
        }
    }
}

/// Point-in-time capture of the streaming-eligible account set. Drives
/// exactly one restart cycle; superseded by the next capture, never
/// merged.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    accounts: Vec<StreamAccount>,
    taken_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn capture(accounts: Vec<StreamAccount>) -> Self {
        Self {
            accounts,
            taken_at: Utc::now(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamAccount> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Order-insensitive id set spanning every eligible account,
    /// regardless of its streaming preference.
    pub fn account_ids(&self) -> HashSet<AccountId> {
        self.accounts.iter().map(|a| a.id.clone()).collect()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}
