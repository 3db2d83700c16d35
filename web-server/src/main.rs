// web-server/src/main.rs
mod api;
mod interceptor;
mod middleware;
mod static_files;

use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use interceptor::InterceptorSettings;
use middleware::EdgeInterceptor;
use static_files::ShellAssets;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing("info");

    // Fail fast: nothing is served with a broken configuration
    let config = Config::load().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let server_addr = config.web_server_addr.clone();
    let interceptor_settings = InterceptorSettings::from_config(&config);
    let shell_assets = ShellAssets::from(&config.static_files);

    tracing::info!(
        "Starting dashboard edge on {} ({} mode, gate policy {:?})",
        server_addr,
        config.run_mode.as_str(),
        config.gate
    );
    #[cfg(feature = "dev-fallback")]
    if interceptor_settings.fallback_credential.is_some() {
        tracing::warn!("Development fallback credential is enabled");
    }

    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        let shell_assets = shell_assets.clone();
        App::new()
            .app_data(config_data.clone())
            .wrap(EdgeInterceptor::new(interceptor_settings.clone()))
            .configure(api::configure)
            .configure(move |cfg| static_files::configure(cfg, shell_assets))
    })
    .bind(&server_addr)?
    .run()
    .await
}
