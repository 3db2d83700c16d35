// common/src/credential.rs
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// An opaque bearer credential. Never empty; absence is `Option::None`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty or whitespace-only input. Anything else is
    /// kept exactly as given.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..12].to_string()
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.fingerprint())
    }
}

/// Where a credential came from. Logging and precedence only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    UrlCapture,
    PersistedStore,
    DevelopmentFallback,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialSource::UrlCapture => "url-capture",
            CredentialSource::PersistedStore => "persisted-store",
            CredentialSource::DevelopmentFallback => "development-fallback",
        };
        f.write_str(name)
    }
}

/// A credential as kept by a slot, with the moment the store stops trusting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCredential {
    pub credential: Credential,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredential {
    pub fn new(credential: Credential, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { credential, expires_at }
    }

    /// Stale entries read as absent. Server-side revocation is not our concern.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

/// The credential `CredentialStore::read` settled on, and which step produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub source: CredentialSource,
}
