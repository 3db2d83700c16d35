// web-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::{web, Error, HttpMessage, HttpRequest, HttpResponse};
use common::ResolvedCredential;
use std::path::PathBuf;

/// Location of the built dashboard bundle.
#[derive(Clone, Debug)]
pub struct ShellAssets {
    pub root: PathBuf,
    pub index: String,
}

impl ShellAssets {
    fn index_path(&self) -> PathBuf {
        self.root.join(&self.index)
    }
}

impl From<&common::StaticFilesConfig> for ShellAssets {
    fn from(config: &common::StaticFilesConfig) -> Self {
        Self {
            root: PathBuf::from(&config.path),
            index: config.index.clone(),
        }
    }
}

// Unmatched API and asset paths are real 404s, not page routes
fn is_page_route(path: &str) -> bool {
    !["/api", "/assets"].iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

async fn serve_shell(req: HttpRequest, assets: web::Data<ShellAssets>) -> Result<HttpResponse, Error> {
    let path = req.path();
    if !is_page_route(path) {
        return Ok(HttpResponse::NotFound().finish());
    }

    match req.extensions().get::<ResolvedCredential>() {
        Some(resolved) => tracing::debug!("Serving shell for {} ({})", path, resolved.source),
        None => tracing::debug!("Serving shell for {} (anonymous)", path),
    }

    Ok(NamedFile::open(assets.index_path())?.into_response(&req))
}

async fn favicon(req: HttpRequest, assets: web::Data<ShellAssets>) -> Result<HttpResponse, Error> {
    Ok(NamedFile::open(assets.root.join("favicon.ico"))?.into_response(&req))
}

/// Mount `/assets`, `/favicon.ico` and the shell fallback for every other route.
pub fn configure(cfg: &mut web::ServiceConfig, assets: ShellAssets) {
    let bundle = assets.root.join("assets");

    cfg.app_data(web::Data::new(assets))
        .service(
            Files::new("/assets", bundle)
                .prefer_utf8(true)
                .use_etag(true)
                .use_last_modified(true),
        )
        .service(web::resource("/favicon.ico").to(favicon))
        .default_service(web::route().to(serve_shell));
}
