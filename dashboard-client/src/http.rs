// dashboard-client/src/http.rs
//! Credential-aware JSON client for the dashboard backend.
//!
//! Every call reads the credential store fresh, so a credential written
//! between two calls is picked up by the second one.
use common::CredentialStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Whether the stored credential is sent with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    #[default]
    Attach,
    Omit,
}

#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent verbatim.
    Text(String),
    /// Multipart form. The transport sets the boundary header.
    Form(Form),
    /// Serialized as JSON. `Value::Null` sends no body.
    Json(Value),
}

#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    pub credential_mode: CredentialMode,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestFailed> {
        let value = serde_json::to_value(body).map_err(|e| RequestFailed {
            kind: FailureKind::InvalidRequest,
            status: None,
            message: format!("Failed to serialize request body: {}", e),
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    pub fn form(mut self, form: Form) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Caller headers win over the defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn credential_mode(mut self, mode: CredentialMode) -> Self {
        self.credential_mode = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced a response.
    Transport,
    /// The backend answered with a non-2xx status.
    Status,
    /// 2xx with a body that does not decode as the expected type.
    MalformedBody,
    /// The request could not be built.
    InvalidRequest,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestFailed {
    pub kind: FailureKind,
    pub status: Option<StatusCode>,
    pub message: String,
}

impl RequestFailed {
    fn transport(err: reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Transport,
            status: err.status(),
            message: format!("Request failed: {}", err),
        }
    }

    fn invalid(message: String) -> Self {
        Self {
            kind: FailureKind::InvalidRequest,
            status: None,
            message,
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

impl HttpClient {
    pub fn new(base_url: &Url, store: Arc<CredentialStore>) -> Result<Self, RequestFailed> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(RequestFailed::transport)?;

        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue one request against the backend and decode the JSON response.
    ///
    /// Non-2xx responses fail with the body's `message` or `error` field,
    /// falling back to the status reason.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, RequestFailed> {
        let url = self.url_for(path);
        let headers = self.build_headers(path, &options)?;
        let method: Method = options.method.into();

        tracing::debug!("{} {}", method, url);

        let mut builder = self.http.request(method, &url).headers(headers);
        builder = match options.body {
            RequestBody::Empty | RequestBody::Json(Value::Null) => builder,
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Form(form) => builder.multipart(form),
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value).map_err(|e| {
                    RequestFailed::invalid(format!("Failed to serialize request body: {}", e))
                })?;
                builder.body(bytes)
            }
        };

        let response = builder.send().await.map_err(RequestFailed::transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(RequestFailed::transport)?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::warn!("{} on {}: {}", status.as_u16(), path, message);
            return Err(RequestFailed {
                kind: FailureKind::Status,
                status: Some(status),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| RequestFailed {
            kind: FailureKind::MalformedBody,
            status: Some(status),
            message: format!("Unexpected response body from {}: {}", path, e),
        })
    }

    fn build_headers(&self, path: &str, options: &RequestOptions) -> Result<HeaderMap, RequestFailed> {
        let mut headers = HeaderMap::new();

        if !matches!(options.body, RequestBody::Form(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if options.credential_mode == CredentialMode::Attach {
            match self.store.read() {
                Some(resolved) => {
                    let value = HeaderValue::from_str(&resolved.credential.bearer()).map_err(|_| {
                        RequestFailed::invalid("Stored credential is not a valid header value".to_string())
                    })?;
                    headers.insert(AUTHORIZATION, value);
                }
                None => tracing::warn!("No credential available for {}", path),
            }
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RequestFailed::invalid(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RequestFailed::invalid(format!("Invalid value for {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    let field = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ["message", "error"].iter().find_map(|key| match value.get(*key) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        })
    });

    field.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    })
}
