// web-server/src/api/mod.rs
pub mod auth;
pub mod logs;

use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Operations Dashboard edge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(api_index)
            .service(logs::record_client_log)
    )
    .service(
        actix_web::web::scope("/auth")
            .service(auth::logout)
    );
}
