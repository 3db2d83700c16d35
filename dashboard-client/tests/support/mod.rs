// dashboard-client/tests/support/mod.rs
#![allow(dead_code)]

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use common::{CookieSameSite, CookieScope, CredentialStore, MemorySlot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct Canned {
    status: u16,
    body: String,
    delay: Option<Duration>,
    required_bearer: Option<String>,
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Canned>,
    recorded: Vec<RecordedRequest>,
}

/// Loopback backend that records every request and answers from a table.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: serde_json::Value) {
        self.install(path, status, body.to_string(), None, None);
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        self.install(path, status, body.to_string(), None, None);
    }

    pub fn respond_slowly(&self, path: &str, status: u16, body: serde_json::Value, delay: Duration) {
        self.install(path, status, body.to_string(), Some(delay), None);
    }

    /// Answer only requests carrying `Bearer <token>`; others get a 401.
    pub fn respond_authorized(&self, path: &str, token: &str, body: serde_json::Value) {
        self.install(path, 200, body.to_string(), None, Some(format!("Bearer {}", token)));
    }

    fn install(
        &self,
        path: &str,
        status: u16,
        body: String,
        delay: Option<Duration>,
        required_bearer: Option<String>,
    ) {
        self.state.lock().unwrap().routes.insert(
            path.to_string(),
            Canned {
                status,
                body,
                delay,
                required_bearer,
            },
        );
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.recorded().iter().filter(|r| r.path == path).count()
    }

    /// Bind to an ephemeral port and serve. Returns the `/api` base URL.
    pub fn start(&self) -> Url {
        let backend = web::Data::new(self.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(backend.clone())
                .default_service(web::to(handle))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind mock backend");

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        Url::parse(&format!("http://{}/api", addr)).unwrap()
    }
}

async fn handle(req: HttpRequest, body: web::Bytes, backend: web::Data<MockBackend>) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let canned = {
        let mut state = backend.state.lock().unwrap();
        state.recorded.push(recorded.clone());
        state.routes.get(req.path()).cloned()
    };

    let Some(canned) = canned else {
        return HttpResponse::NotFound()
            .content_type("application/json")
            .body(r#"{"error":true,"message":"not found"}"#);
    };

    if let Some(delay) = canned.delay {
        actix_web::rt::time::sleep(delay).await;
    }

    if let Some(expected) = &canned.required_bearer {
        if recorded.authorization.as_deref() != Some(expected.as_str()) {
            return HttpResponse::Unauthorized()
                .content_type("application/json")
                .body(r#"{"error":true,"message":"unauthorized"}"#);
        }
    }

    HttpResponse::build(StatusCode::from_u16(canned.status).unwrap())
        .content_type("application/json")
        .body(canned.body)
}

pub fn scope() -> CookieScope {
    CookieScope {
        name: "access_token".to_string(),
        path: "/".to_string(),
        max_age_secs: 7200,
        same_site: CookieSameSite::Lax,
        secure: false,
        http_only: false,
    }
}

/// A store backed by one in-memory slot, with no development layers.
pub fn empty_store() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new(Arc::new(MemorySlot::default()), scope()))
}

pub fn user_body() -> serde_json::Value {
    serde_json::json!({
        "results": {
            "id": "42",
            "nome": "Lucas Silva",
            "email": "lucas@empresa.com",
            "avatar": null,
            "departamento": "Operações",
            "cargo": "Analista",
            "empresa": "Empresa",
            "ativo": "S",
            "possui_ramal": "N",
            "line_id": "7",
            "permissoes": ["dashboard.view"]
        }
    })
}
