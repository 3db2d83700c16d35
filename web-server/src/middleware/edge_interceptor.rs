// web-server/src/middleware/edge_interceptor.rs
use std::sync::Arc;
use actix_web::{
    body::EitherBody,
    cookie::Cookie,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderValue},
    Error, HttpMessage, HttpResponse,
};
use common::{CookieScope, CredentialStore};
use futures_util::future::{LocalBoxFuture, Ready, ready};

use crate::interceptor::cookie_slot::RequestCookieSlot;
use crate::interceptor::{decide, is_navigation, Decision, InterceptorSettings};

/// Middleware running the credential state machine in front of every page.
#[derive(Debug, Clone)]
pub struct EdgeInterceptor {
    settings: Arc<InterceptorSettings>,
}

impl EdgeInterceptor {
    pub fn new(settings: InterceptorSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for EdgeInterceptor
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = EdgeInterceptorMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(EdgeInterceptorMiddleware {
            service,
            settings: self.settings.clone(),
        }))
    }
}

pub struct EdgeInterceptorMiddleware<S> {
    service: S,
    settings: Arc<InterceptorSettings>,
}

impl<S, B> Service<ServiceRequest> for EdgeInterceptorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !is_navigation(req.method()) {
            tracing::debug!("{} {} is not a navigation, skipping credential checks", req.method(), req.path());
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        let slot = Arc::new(RequestCookieSlot::from_request(
            req.request(),
            &self.settings.scope.name,
        ));
        let store = CredentialStore::new(slot.clone(), self.settings.scope.clone());

        let decision = decide(&self.settings, req.path(), req.query_string(), &store);
        let set_cookie = slot.take_pending();

        if let Some(location) = decision.redirect_location() {
            let res = req.into_response(redirect(location, set_cookie)).map_into_right_body();
            return Box::pin(async move { Ok(res) });
        }

        match decision {
            Decision::PassThrough(resolved) => {
                req.extensions_mut().insert(resolved);
            }
            #[cfg(feature = "dev-fallback")]
            Decision::FallbackIssued(credential) => {
                req.extensions_mut().insert(common::ResolvedCredential {
                    credential,
                    source: common::CredentialSource::DevelopmentFallback,
                });
            }
            _ => {}
        }

        // Continue with the regular service
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Some(cookie) = set_cookie {
                match HeaderValue::from_str(&CookieScope::header_value(&cookie)) {
                    Ok(value) => {
                        res.headers_mut().append(header::SET_COOKIE, value);
                    }
                    Err(e) => tracing::warn!("Failed to attach credential cookie: {}", e),
                }
            }
            Ok(res.map_into_left_body())
        })
    }
}

fn redirect(location: &str, cookie: Option<Cookie<'static>>) -> HttpResponse {
    let mut builder = HttpResponse::TemporaryRedirect();
    builder.insert_header((header::LOCATION, location));
    if let Some(cookie) = cookie {
        builder.append_header((header::SET_COOKIE, CookieScope::header_value(&cookie)));
    }
    builder.finish()
}
