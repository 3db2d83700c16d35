// dashboard-client/src/main.rs
//! Resolve the dashboard session the way the browser app does and report it.
//!
//! Usage: `session-probe [credential]`. A credential given on the command
//! line is captured into the store before the identity check.
use actix::Actor;
use common::{setup_tracing, ClientCookieSlot, Config, Credential, CredentialStore};
use dashboard_client::{Bootstrap, BootstrapOutcome, GetCurrentUser, HttpClient, SessionBootstrap};
use std::io;
use std::sync::Arc;

#[actix::main]
async fn main() -> io::Result<()> {
    setup_tracing("info");

    let config = Config::load().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let slot = Arc::new(ClientCookieSlot::new(config.credential.cookie_name.clone()));
    let store = Arc::new(CredentialStore::for_client(slot, &config));

    if let Some(arg) = std::env::args().nth(1) {
        match Credential::new(&arg) {
            Some(credential) => {
                tracing::info!("Captured credential {} from arguments", credential.fingerprint());
                store.write(&credential, store.scope());
                #[cfg(feature = "dev-fallback")]
                if store.write_local(&credential) {
                    tracing::debug!("Credential also kept in the local development slot");
                }
            }
            None => tracing::warn!("Ignoring empty credential argument"),
        }
    }

    let client = HttpClient::new(&config.api_base_url, store)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let bootstrap = SessionBootstrap::new(client, &config.identity).start();

    let outcome = bootstrap
        .send(Bootstrap)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let user = bootstrap
        .send(GetCurrentUser)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    match (outcome, user) {
        (BootstrapOutcome::Authenticated, Some(user)) => {
            tracing::info!(
                "Session active for {} <{}>, {} permission(s)",
                user.display_name,
                user.email,
                user.permissions.len()
            );
        }
        _ => tracing::warn!("No authenticated session against {}", config.api_base_url),
    }

    Ok(())
}
