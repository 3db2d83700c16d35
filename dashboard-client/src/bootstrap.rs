// dashboard-client/src/bootstrap.rs
use actix::prelude::*;
use common::models::user::{CurrentUser, IdentityEnvelope};
use common::IdentitySettings;
use std::time::Duration;
use thiserror::Error;

use crate::http::{HttpClient, RequestFailed, RequestOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Authenticated,
    Anonymous,
    /// Identity was already resolved; nothing was sent.
    AlreadyResolved,
}

/// Resolve the current user once. Later sends are no-ops.
#[derive(Message)]
#[rtype(result = "BootstrapOutcome")]
pub struct Bootstrap;

/// Re-run the identity check regardless of earlier results.
#[derive(Message)]
#[rtype(result = "BootstrapOutcome")]
pub struct Refresh;

#[derive(Message)]
#[rtype(result = "Option<CurrentUser>")]
pub struct GetCurrentUser;

#[derive(Debug, Error)]
enum BootstrapFailure {
    #[error("identity check failed: {0}")]
    Request(#[from] RequestFailed),
    #[error("identity check timed out after {0:?}")]
    TimedOut(Duration),
}

/// Owns the current user for the process.
///
/// Identity checks run one at a time; a `Bootstrap` queued behind a running
/// check sees its result instead of starting another.
pub struct SessionBootstrap {
    client: HttpClient,
    identity_path: String,
    timeout: Duration,
    resolved: bool,
    current_user: Option<CurrentUser>,
}

impl SessionBootstrap {
    pub fn new(client: HttpClient, identity: &IdentitySettings) -> Self {
        Self {
            client,
            identity_path: identity.path.clone(),
            timeout: identity.timeout,
            resolved: false,
            current_user: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve(&mut self) -> AtomicResponse<Self, BootstrapOutcome> {
        let client = self.client.clone();
        let path = self.identity_path.clone();
        let timeout = self.timeout;

        let check = async move {
            match tokio::time::timeout(
                timeout,
                client.request::<IdentityEnvelope>(&path, RequestOptions::new()),
            )
            .await
            {
                Ok(Ok(envelope)) => Ok(envelope.results),
                Ok(Err(e)) => Err(BootstrapFailure::from(e)),
                Err(_) => Err(BootstrapFailure::TimedOut(timeout)),
            }
        };

        AtomicResponse::new(Box::pin(
            check
                .into_actor(self)
                .map(|result, act, _ctx| act.apply(result)),
        ))
    }

    fn apply(&mut self, result: Result<CurrentUser, BootstrapFailure>) -> BootstrapOutcome {
        self.resolved = true;
        match result {
            Ok(user) => {
                tracing::info!("Authenticated as {} ({})", user.display_name, user.id);
                self.current_user = Some(user);
                BootstrapOutcome::Authenticated
            }
            Err(e) => {
                tracing::warn!("Continuing unauthenticated: {}", e);
                self.current_user = None;
                BootstrapOutcome::Anonymous
            }
        }
    }
}

impl Actor for SessionBootstrap {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Session bootstrap started, identity at {}", self.identity_path);
    }
}

impl Handler<Bootstrap> for SessionBootstrap {
    type Result = AtomicResponse<Self, BootstrapOutcome>;

    fn handle(&mut self, _msg: Bootstrap, _ctx: &mut Self::Context) -> Self::Result {
        if self.resolved {
            return AtomicResponse::new(Box::pin(actix::fut::ready(
                BootstrapOutcome::AlreadyResolved,
            )));
        }
        self.resolve()
    }
}

impl Handler<Refresh> for SessionBootstrap {
    type Result = AtomicResponse<Self, BootstrapOutcome>;

    fn handle(&mut self, _msg: Refresh, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!("Refreshing identity");
        self.resolve()
    }
}

impl Handler<GetCurrentUser> for SessionBootstrap {
    type Result = MessageResult<GetCurrentUser>;

    fn handle(&mut self, _msg: GetCurrentUser, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.current_user.clone())
    }
}
