// common/src/store.rs
//! Credential persistence.
//!
//! `CredentialStore::read` resolves in a fixed order:
//!
//! 1. the persisted slot (the `access_token` cookie),
//! 2. the local fallback slot, development builds only,
//! 3. the statically configured development credential, development builds only.
//!
//! Steps 2 and 3 are compiled in by the `dev-fallback` feature. A binary built
//! with `--no-default-features` has no code path that can reach them.
//!
//! Slot failures never surface to callers: an unavailable slot reads as absent.
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex, RwLock};

use crate::config::{Config, CookieSameSite};
use crate::credential::{Credential, CredentialSource, ResolvedCredential, StoredCredential};
use crate::error::SlotError;

/// Attributes applied to the persisted credential slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieScope {
    pub name: String,
    pub path: String,
    pub max_age_secs: i64,
    pub same_site: CookieSameSite,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieScope {
    pub fn build_cookie(&self, value: &str) -> Cookie<'static> {
        Cookie::build(self.name.clone(), value.to_string())
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site())
            .max_age(CookieDuration::seconds(self.max_age_secs))
            .finish()
    }

    /// Expired, empty cookie with matching attributes so the browser drops it.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone(), "")
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site())
            .max_age(CookieDuration::seconds(0))
            .finish()
    }

    pub fn stored(&self, credential: &Credential) -> StoredCredential {
        StoredCredential::new(
            credential.clone(),
            Some(Utc::now() + Duration::seconds(self.max_age_secs)),
        )
    }

    /// `Set-Cookie` header value with the cookie value percent-encoded.
    ///
    /// actix decodes incoming cookies, so this is the only form that reads
    /// back unchanged and cannot smuggle attributes through the value.
    pub fn header_value(cookie: &Cookie<'_>) -> String {
        cookie.encoded().to_string()
    }

    fn same_site(&self) -> SameSite {
        match self.same_site {
            CookieSameSite::Strict => SameSite::Strict,
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::None => SameSite::None,
        }
    }
}

/// A place a credential can live.
pub trait CredentialSlot: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredential>, SlotError>;
    fn save(&self, stored: StoredCredential, scope: &CookieScope) -> Result<(), SlotError>;
    fn remove(&self, scope: &CookieScope) -> Result<(), SlotError>;
}

pub struct CredentialStore {
    persisted: Arc<dyn CredentialSlot>,
    scope: CookieScope,
    #[cfg(feature = "dev-fallback")]
    local: Option<Arc<dyn CredentialSlot>>,
    #[cfg(feature = "dev-fallback")]
    development: Option<Credential>,
}

impl CredentialStore {
    /// Store backed only by the persisted slot.
    pub fn new(persisted: Arc<dyn CredentialSlot>, scope: CookieScope) -> Self {
        Self {
            persisted,
            scope,
            #[cfg(feature = "dev-fallback")]
            local: None,
            #[cfg(feature = "dev-fallback")]
            development: None,
        }
    }

    /// Client-side store with the development layers the configuration allows.
    pub fn for_client(persisted: Arc<dyn CredentialSlot>, config: &Config) -> Self {
        #[allow(unused_mut)]
        let mut store = Self::new(persisted, config.cookie_scope());

        #[cfg(feature = "dev-fallback")]
        {
            if config.credential.allow_local_credential_fallback {
                store = store.with_local_slot(Arc::new(MemorySlot::default()));
            }
            store = store.with_development_credential(config.credential.fallback_credential.clone());
        }

        store
    }

    #[cfg(feature = "dev-fallback")]
    pub fn with_local_slot(mut self, slot: Arc<dyn CredentialSlot>) -> Self {
        self.local = Some(slot);
        self
    }

    #[cfg(feature = "dev-fallback")]
    pub fn with_development_credential(mut self, credential: Option<Credential>) -> Self {
        self.development = credential;
        self
    }

    /// Mirror `credential` into the local fallback slot, if one is configured.
    /// Returns whether it was written.
    #[cfg(feature = "dev-fallback")]
    pub fn write_local(&self, credential: &Credential) -> bool {
        let Some(slot) = &self.local else {
            return false;
        };
        match slot.save(self.scope.stored(credential), &self.scope) {
            Ok(()) => {
                tracing::debug!("Credential {} mirrored to the local slot", credential.fingerprint());
                true
            }
            Err(e) => {
                tracing::warn!("Credential not mirrored locally: {}", e);
                false
            }
        }
    }

    pub fn scope(&self) -> &CookieScope {
        &self.scope
    }

    /// Persist `credential` with the given scope. An unavailable slot is logged and ignored.
    pub fn write(&self, credential: &Credential, scope: &CookieScope) {
        match self.persisted.save(scope.stored(credential), scope) {
            Ok(()) => tracing::debug!(
                "Credential {} persisted in slot '{}' (max-age {}s)",
                credential.fingerprint(),
                scope.name,
                scope.max_age_secs
            ),
            Err(e) => tracing::warn!("Credential not persisted: {}", e),
        }
    }

    pub fn read(&self) -> Option<ResolvedCredential> {
        if let Some(credential) = load_fresh(self.persisted.as_ref()) {
            return Some(ResolvedCredential {
                credential,
                source: CredentialSource::PersistedStore,
            });
        }

        #[cfg(feature = "dev-fallback")]
        {
            let local = self.local.as_ref().and_then(|slot| load_fresh(slot.as_ref()));
            if let Some(credential) = local {
                tracing::debug!("Using credential from the local development slot");
                return Some(ResolvedCredential {
                    credential,
                    source: CredentialSource::DevelopmentFallback,
                });
            }

            if let Some(credential) = &self.development {
                tracing::debug!("Using the configured development credential");
                return Some(ResolvedCredential {
                    credential: credential.clone(),
                    source: CredentialSource::DevelopmentFallback,
                });
            }
        }

        None
    }

    /// Remove the persisted credential. Safe to call when nothing is stored.
    pub fn clear(&self) {
        if let Err(e) = self.persisted.remove(&self.scope) {
            tracing::warn!("Credential not cleared: {}", e);
        }
    }
}

fn load_fresh(slot: &dyn CredentialSlot) -> Option<Credential> {
    match slot.load() {
        Ok(Some(stored)) if stored.is_stale(Utc::now()) => {
            tracing::debug!("Ignoring stale credential {}", stored.credential.fingerprint());
            None
        }
        Ok(Some(stored)) => Some(stored.credential),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Credential slot unreadable, treating as absent: {}", e);
            None
        }
    }
}

/// In-process slot. Stands in for browser-local storage.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: RwLock<Option<StoredCredential>>,
}

impl CredentialSlot for MemorySlot {
    fn load(&self) -> Result<Option<StoredCredential>, SlotError> {
        let guard = self
            .value
            .read()
            .map_err(|_| SlotError::Unavailable("memory slot poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, stored: StoredCredential, _scope: &CookieScope) -> Result<(), SlotError> {
        let mut guard = self
            .value
            .write()
            .map_err(|_| SlotError::Unavailable("memory slot poisoned".to_string()))?;
        *guard = Some(stored);
        Ok(())
    }

    fn remove(&self, _scope: &CookieScope) -> Result<(), SlotError> {
        let mut guard = self
            .value
            .write()
            .map_err(|_| SlotError::Unavailable("memory slot poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Client-side cookie slot: holds the `access_token` cookie the edge handed out.
#[derive(Debug)]
pub struct ClientCookieSlot {
    name: String,
    value: Mutex<Option<StoredCredential>>,
}

impl ClientCookieSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Mutex::new(None),
        }
    }

    /// Apply a `Set-Cookie` header. Cookies with another name are ignored; an
    /// empty value or zero max-age removes the credential.
    pub fn absorb_set_cookie(&self, header: &str) -> Result<(), SlotError> {
        let cookie = match Cookie::parse_encoded(header.to_string()) {
            Ok(cookie) => cookie,
            Err(e) => {
                tracing::debug!("Ignoring unparsable Set-Cookie header: {}", e);
                return Ok(());
            }
        };

        if cookie.name() != self.name {
            return Ok(());
        }

        let max_age = cookie.max_age().map(|d| d.whole_seconds());
        let mut guard = self
            .value
            .lock()
            .map_err(|_| SlotError::Unavailable("cookie slot poisoned".to_string()))?;

        match (Credential::new(cookie.value()), max_age) {
            (Some(credential), Some(secs)) if secs > 0 => {
                *guard = Some(StoredCredential::new(credential, Some(Utc::now() + Duration::seconds(secs))));
            }
            (Some(credential), None) => {
                // Session cookie
                *guard = Some(StoredCredential::new(credential, None));
            }
            _ => *guard = None,
        }

        Ok(())
    }
}

impl CredentialSlot for ClientCookieSlot {
    fn load(&self) -> Result<Option<StoredCredential>, SlotError> {
        let guard = self
            .value
            .lock()
            .map_err(|_| SlotError::Unavailable("cookie slot poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, stored: StoredCredential, _scope: &CookieScope) -> Result<(), SlotError> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| SlotError::Unavailable("cookie slot poisoned".to_string()))?;
        *guard = Some(stored);
        Ok(())
    }

    fn remove(&self, _scope: &CookieScope) -> Result<(), SlotError> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| SlotError::Unavailable("cookie slot poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SandboxedSlot;

    impl CredentialSlot for SandboxedSlot {
        fn load(&self) -> Result<Option<StoredCredential>, SlotError> {
            Err(SlotError::Unavailable("sandboxed".to_string()))
        }

        fn save(&self, _stored: StoredCredential, _scope: &CookieScope) -> Result<(), SlotError> {
            Err(SlotError::Unavailable("sandboxed".to_string()))
        }

        fn remove(&self, _scope: &CookieScope) -> Result<(), SlotError> {
            Err(SlotError::Unavailable("sandboxed".to_string()))
        }
    }

    fn scope() -> CookieScope {
        CookieScope {
            name: "access_token".to_string(),
            path: "/".to_string(),
            max_age_secs: 7200,
            same_site: CookieSameSite::Lax,
            secure: false,
            http_only: false,
        }
    }

    fn credential(value: &str) -> Credential {
        Credential::new(value).unwrap()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let store = CredentialStore::new(Arc::new(MemorySlot::default()), scope());
        store.write(&credential("abc123"), &scope());

        let resolved = store.read().unwrap();
        assert_eq!(resolved.credential.expose(), "abc123");
        assert_eq!(resolved.source, CredentialSource::PersistedStore);
    }

    #[test]
    fn test_later_write_replaces_earlier() {
        let store = CredentialStore::new(Arc::new(MemorySlot::default()), scope());
        store.write(&credential("first"), &scope());
        store.write(&credential("second"), &scope());

        assert_eq!(store.read().unwrap().credential.expose(), "second");
    }

    #[test]
    fn test_stale_credential_reads_as_absent() {
        let store = CredentialStore::new(Arc::new(MemorySlot::default()), scope());
        let expired = CookieScope { max_age_secs: 0, ..scope() };
        store.write(&credential("abc123"), &expired);

        assert!(store.read().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::new(Arc::new(MemorySlot::default()), scope());
        store.write(&credential("abc123"), &scope());

        store.clear();
        store.clear();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_unavailable_slot_degrades_to_absent() {
        let store = CredentialStore::new(Arc::new(SandboxedSlot), scope());
        store.write(&credential("abc123"), &scope());
        store.clear();

        assert!(store.read().is_none());
    }

    #[test]
    fn test_cookie_attributes_follow_scope() {
        let cookie = scope().build_cookie("abc123");
        assert_eq!(cookie.name(), "access_token");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(7200)));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));

        let removal = scope().removal_cookie();
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(CookieDuration::seconds(0)));
    }

    #[test]
    fn test_client_slot_absorbs_edge_cookie() {
        let slot = Arc::new(ClientCookieSlot::new("access_token"));
        let store = CredentialStore::new(slot.clone(), scope());

        slot.absorb_set_cookie("theme=dark; Path=/").unwrap();
        assert!(store.read().is_none());

        slot.absorb_set_cookie("access_token=abc123; Path=/; Max-Age=7200; SameSite=Lax")
            .unwrap();
        assert_eq!(store.read().unwrap().credential.expose(), "abc123");

        slot.absorb_set_cookie("access_token=; Path=/; Max-Age=0").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_header_value_cannot_inject_attributes() {
        let header = CookieScope::header_value(&scope().build_cookie("abc;Domain=evil.example"));
        assert!(header.starts_with("access_token=abc%3B"));

        let parsed = Cookie::parse_encoded(header).unwrap();
        assert_eq!(parsed.value(), "abc;Domain=evil.example");
        assert_eq!(parsed.domain(), None);
        assert_eq!(parsed.max_age(), Some(CookieDuration::seconds(7200)));
    }

    #[test]
    fn test_client_slot_round_trips_encoded_value() {
        let slot = Arc::new(ClientCookieSlot::new("access_token"));
        let store = CredentialStore::new(slot.clone(), scope());

        for value in ["abc;Domain=evil.example", "a%2Fb", " padded value "] {
            let header = CookieScope::header_value(&scope().build_cookie(value));
            slot.absorb_set_cookie(&header).unwrap();
            assert_eq!(store.read().unwrap().credential.expose(), value);
        }
    }

    fn client_config(fallback: Option<&str>, allow_local: bool) -> Config {
        use crate::config::{ConfigSource, CredentialSection};

        Config::from_source(ConfigSource {
            api_base_url: Some("https://api.example.com".to_string()),
            app_url: Some("https://dash.example.com".to_string()),
            login_url: Some("https://sso.example.com/login".to_string()),
            credential: CredentialSection {
                fallback_credential: fallback.map(str::to_string),
                allow_local_credential_fallback: allow_local,
                ..CredentialSection::default()
            },
            ..ConfigSource::default()
        })
        .unwrap()
    }

    #[cfg(feature = "dev-fallback")]
    #[test]
    fn test_client_store_layers_follow_config() {
        let config = client_config(Some("static-dev"), true);
        let store = CredentialStore::for_client(Arc::new(MemorySlot::default()), &config);

        assert_eq!(store.read().unwrap().credential.expose(), "static-dev");

        assert!(store.write_local(&credential("local")));
        let resolved = store.read().unwrap();
        assert_eq!(resolved.credential.expose(), "local");
        assert_eq!(resolved.source, CredentialSource::DevelopmentFallback);

        store.write(&credential("cookie"), store.scope());
        assert_eq!(store.read().unwrap().credential.expose(), "cookie");
    }

    #[cfg(feature = "dev-fallback")]
    #[test]
    fn test_client_store_without_local_slot() {
        let config = client_config(None, false);
        let store = CredentialStore::for_client(Arc::new(MemorySlot::default()), &config);

        assert!(!store.write_local(&credential("local")));
        assert!(store.read().is_none());
    }

    #[cfg(not(feature = "dev-fallback"))]
    #[test]
    fn test_fallback_config_ignored_when_compiled_out() {
        let config = client_config(Some("static-dev"), true);
        let store = CredentialStore::for_client(Arc::new(MemorySlot::default()), &config);

        assert!(store.read().is_none());

        store.write(&credential("cookie"), store.scope());
        assert_eq!(store.read().unwrap().source, CredentialSource::PersistedStore);
    }

    #[cfg(feature = "dev-fallback")]
    #[test]
    fn test_resolution_order_in_development() {
        let persisted = Arc::new(MemorySlot::default());
        let local = Arc::new(MemorySlot::default());
        let store = CredentialStore::new(persisted.clone(), scope())
            .with_local_slot(local.clone())
            .with_development_credential(Credential::new("static-dev"));

        let resolved = store.read().unwrap();
        assert_eq!(resolved.credential.expose(), "static-dev");
        assert_eq!(resolved.source, CredentialSource::DevelopmentFallback);

        local.save(scope().stored(&credential("local")), &scope()).unwrap();
        assert_eq!(store.read().unwrap().credential.expose(), "local");

        store.write(&credential("cookie"), &scope());
        let resolved = store.read().unwrap();
        assert_eq!(resolved.credential.expose(), "cookie");
        assert_eq!(resolved.source, CredentialSource::PersistedStore);
    }

    #[cfg(feature = "dev-fallback")]
    #[test]
    fn test_unavailable_slot_falls_through_to_development_credential() {
        let store = CredentialStore::new(Arc::new(SandboxedSlot), scope())
            .with_development_credential(Credential::new("static-dev"));

        assert_eq!(store.read().unwrap().credential.expose(), "static-dev");
    }
}
