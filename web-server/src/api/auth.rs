// web-server/src/api/auth.rs
use actix_web::{http::header, post, web, HttpRequest, HttpResponse};
use common::{Config, CookieScope, CredentialStore};
use std::sync::Arc;

use crate::interceptor::cookie_slot::RequestCookieSlot;

// Drop the credential cookie and send the browser to the login surface
#[post("/logout")]
pub async fn logout(req: HttpRequest, config: web::Data<Config>) -> HttpResponse {
    let scope = config.cookie_scope();
    let slot = Arc::new(RequestCookieSlot::from_request(&req, &scope.name));
    let store = CredentialStore::new(slot.clone(), scope);

    if let Some(resolved) = store.read() {
        tracing::info!("Logging out credential {}", resolved.credential.fingerprint());
    }
    store.clear();

    let mut response = HttpResponse::SeeOther();
    response.insert_header((header::LOCATION, config.login_url.as_str()));
    if let Some(cookie) = slot.take_pending() {
        response.append_header((header::SET_COOKIE, CookieScope::header_value(&cookie)));
    }
    response.finish()
}
