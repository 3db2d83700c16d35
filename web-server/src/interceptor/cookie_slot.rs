// web-server/src/interceptor/cookie_slot.rs
use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use common::{CookieScope, Credential, CredentialSlot, SlotError, StoredCredential};
use std::sync::Mutex;

enum PendingWrite {
    Set(StoredCredential, Cookie<'static>),
    Remove(Cookie<'static>),
}

/// The browser's credential cookie as seen from one request.
///
/// Reads come from the incoming `Cookie` header; writes are held until the
/// response is built and then emitted as `Set-Cookie`. A write is visible to
/// later reads within the same request.
pub struct RequestCookieSlot {
    incoming: Option<Credential>,
    pending: Mutex<Option<PendingWrite>>,
}

impl RequestCookieSlot {
    pub fn from_request(req: &HttpRequest, cookie_name: &str) -> Self {
        let incoming = req
            .cookie(cookie_name)
            .and_then(|cookie| Credential::new(cookie.value()));

        Self {
            incoming,
            pending: Mutex::new(None),
        }
    }

    /// The `Set-Cookie` to attach to the response, if anything was written.
    pub fn take_pending(&self) -> Option<Cookie<'static>> {
        let mut guard = self.pending.lock().ok()?;
        match guard.take()? {
            PendingWrite::Set(_, cookie) => Some(cookie),
            PendingWrite::Remove(cookie) => Some(cookie),
        }
    }
}

impl CredentialSlot for RequestCookieSlot {
    fn load(&self) -> Result<Option<StoredCredential>, SlotError> {
        let guard = self
            .pending
            .lock()
            .map_err(|_| SlotError::Unavailable("request slot poisoned".to_string()))?;

        Ok(match guard.as_ref() {
            Some(PendingWrite::Set(stored, _)) => Some(stored.clone()),
            Some(PendingWrite::Remove(_)) => None,
            // The browser enforces max-age on what it sends us
            None => self
                .incoming
                .clone()
                .map(|credential| StoredCredential::new(credential, None)),
        })
    }

    fn save(&self, stored: StoredCredential, scope: &CookieScope) -> Result<(), SlotError> {
        let cookie = scope.build_cookie(stored.credential.expose());
        let mut guard = self
            .pending
            .lock()
            .map_err(|_| SlotError::Unavailable("request slot poisoned".to_string()))?;
        *guard = Some(PendingWrite::Set(stored, cookie));
        Ok(())
    }

    fn remove(&self, scope: &CookieScope) -> Result<(), SlotError> {
        let mut guard = self
            .pending
            .lock()
            .map_err(|_| SlotError::Unavailable("request slot poisoned".to_string()))?;
        *guard = Some(PendingWrite::Remove(scope.removal_cookie()));
        Ok(())
    }
}
