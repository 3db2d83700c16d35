// web-server/src/interceptor/mod.rs
//! Credential decisions for incoming navigations.
//!
//! Exactly one outcome per request, checked in this order:
//!
//! 1. excluded route prefix: bypass,
//! 2. `token` query parameter: persist it and redirect to the same URL without it,
//! 3. persisted credential: pass through untouched,
//! 4. development fallback credential (`dev-fallback` builds): persist it and proceed,
//! 5. gate: redirect to login or proceed anonymously, per [`GatePolicy`].
//!
//! Only GET and HEAD navigations are considered; other methods are left
//! alone. Only local state is touched here. No network I/O.
pub mod cookie_slot;

use actix_web::http::Method;
use common::{
    Config, CookieScope, Credential, CredentialSource, CredentialStore, GatePolicy,
    ResolvedCredential,
};
use url::form_urlencoded;
use url::Url;

#[derive(Clone, Debug)]
pub struct InterceptorSettings {
    pub query_param: String,
    pub excluded_prefixes: Vec<String>,
    pub app_url: Url,
    pub login_url: Url,
    pub gate: GatePolicy,
    pub scope: CookieScope,
    #[cfg(feature = "dev-fallback")]
    pub fallback_credential: Option<Credential>,
}

impl InterceptorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query_param: config.credential.query_param.clone(),
            excluded_prefixes: config.excluded_prefixes.clone(),
            app_url: config.app_url.clone(),
            login_url: config.login_url.clone(),
            gate: config.gate,
            scope: config.cookie_scope(),
            #[cfg(feature = "dev-fallback")]
            fallback_credential: config.credential.fallback_credential.clone(),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            !prefix.is_empty()
                && (path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/')))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateAction {
    RedirectToLogin { location: String },
    ProceedAnonymous,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Bypass,
    PassThrough(ResolvedCredential),
    Capture { credential: Credential, location: String },
    /// `token=` was present but empty: strip it, persist nothing.
    DiscardParameter { location: String },
    #[cfg(feature = "dev-fallback")]
    FallbackIssued(Credential),
    Gate(GateAction),
}

impl Decision {
    /// Where the browser is sent instead of reaching the handler, if anywhere.
    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Decision::Capture { location, .. }
            | Decision::DiscardParameter { location }
            | Decision::Gate(GateAction::RedirectToLogin { location }) => Some(location),
            _ => None,
        }
    }
}

/// Whether a request is a page navigation the state machine applies to.
///
/// Redirecting anything else would make the browser replay its body
/// against the redirect target.
pub fn is_navigation(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// Decide what to do with one request. Writes go through `store`.
pub fn decide(
    settings: &InterceptorSettings,
    path: &str,
    query: &str,
    store: &CredentialStore,
) -> Decision {
    if settings.is_excluded(path) {
        return Decision::Bypass;
    }

    if let Some((value, remaining)) = strip_parameter(query, &settings.query_param) {
        let location = same_path(&settings.app_url, path, &remaining);

        return match Credential::new(&value) {
            Some(credential) => {
                store.write(&credential, &settings.scope);
                tracing::info!(
                    "Captured credential {} ({}) on {}, redirecting to strip it",
                    credential.fingerprint(),
                    CredentialSource::UrlCapture,
                    path
                );
                Decision::Capture { credential, location }
            }
            None => {
                tracing::warn!("Empty '{}' parameter on {}, stripping it", settings.query_param, path);
                Decision::DiscardParameter { location }
            }
        };
    }

    if let Some(resolved) = store.read() {
        tracing::debug!(
            "Credential {} already present ({}) on {}",
            resolved.credential.fingerprint(),
            resolved.source,
            path
        );
        return Decision::PassThrough(resolved);
    }

    #[cfg(feature = "dev-fallback")]
    if let Some(credential) = &settings.fallback_credential {
        store.write(credential, &settings.scope);
        tracing::info!(
            "No credential on {}, issued development fallback {}",
            path,
            credential.fingerprint()
        );
        return Decision::FallbackIssued(credential.clone());
    }

    match settings.gate {
        GatePolicy::RedirectToLogin => {
            tracing::warn!("No credential on {}, redirecting to login", path);
            Decision::Gate(GateAction::RedirectToLogin {
                location: settings.login_url.to_string(),
            })
        }
        GatePolicy::PassThrough => {
            tracing::warn!("No credential on {}, proceeding unauthenticated", path);
            Decision::Gate(GateAction::ProceedAnonymous)
        }
    }
}

/// Remove `name` from a raw query string. Returns the first value found and
/// the re-encoded remainder, or `None` when the parameter is absent.
fn strip_parameter(query: &str, name: &str) -> Option<(String, String)> {
    let mut value = None;
    let mut remaining = form_urlencoded::Serializer::new(String::new());

    for (key, val) in form_urlencoded::parse(query.as_bytes()) {
        if key == name {
            value.get_or_insert_with(|| val.into_owned());
        } else {
            remaining.append_pair(&key, &val);
        }
    }

    value.map(|value| (value, remaining.finish()))
}

fn same_path(app_url: &Url, path: &str, query: &str) -> String {
    let mut target = app_url.clone();
    target.set_path(path);
    target.set_query(if query.is_empty() { None } else { Some(query) });
    target.to_string()
}
