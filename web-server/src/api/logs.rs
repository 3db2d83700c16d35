// web-server/src/api/logs.rs
use actix_web::{post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientLogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// A log line shipped by the browser so it shows up in server output.
#[derive(Debug, Deserialize)]
pub struct ClientLogEntry {
    #[serde(default)]
    pub level: ClientLogLevel,
    pub message: String,
}

#[post("/logs")]
pub async fn record_client_log(entry: web::Json<ClientLogEntry>) -> impl Responder {
    let entry = entry.into_inner();

    match entry.level {
        ClientLogLevel::Debug => tracing::debug!(target: "client", "{}", entry.message),
        ClientLogLevel::Info => tracing::info!(target: "client", "{}", entry.message),
        ClientLogLevel::Warn => tracing::warn!(target: "client", "{}", entry.message),
        ClientLogLevel::Error => tracing::error!(target: "client", "{}", entry.message),
    }

    HttpResponse::Ok().json(json!({ "ok": true }))
}
