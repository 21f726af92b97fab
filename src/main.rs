use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing::{Level, error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use permitdesk::config::Config;
use permitdesk::db::init_store;
use permitdesk::docs::ApiDoc;
use permitdesk::state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let level: Level = config
        .log_level
        .parse()
        .with_context(|| format!("LOG_LEVEL {:?} is not a tracing level", config.log_level))?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "permitdesk.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store = init_store(&config).await.context("failed to initialise storage")?;
    let state = AppState::new(config.clone(), store);

    let warmup = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup.emails.warmup(warmup.store.get_ref()).await {
            error!(error = %e, "Failed to warm up email index");
        }
    });

    let openapi = ApiDoc::openapi();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", openapi.clone()))
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&config.server_addr)
    .with_context(|| format!("failed to bind {}", config.server_addr))?
    .run()
    .await?;

    Ok(())
}
