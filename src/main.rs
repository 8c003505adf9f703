use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod report;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::auto_absence;
use crate::utils::photo_cache::PhotoCache;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Absensi RFID API"
}

fn startup_error(e: anyhow::Error) -> std::io::Error {
    error!(error = %e, "Startup failed");
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env().map_err(startup_error)?;

    info!("Server starting...");

    let pool = init_db(&config.database_url).await.map_err(startup_error)?;

    match (&config.admin_username, &config.admin_password) {
        (Some(username), Some(password)) => {
            auth::handlers::ensure_admin(&pool, username, password)
                .await
                .map_err(startup_error)?;
        }
        (None, None) => {}
        _ => warn!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together; skipping bootstrap"),
    }

    if config.auto_absence_enabled {
        let pool_for_sweep = pool.clone();
        let rest_weekday = config.rest_weekday;
        actix_web::rt::spawn(async move {
            auto_absence::run_scheduler(pool_for_sweep, rest_weekday).await;
        });
    }

    let limiters = Limiters::new(&config).map_err(startup_error)?;
    let photos = Data::new(PhotoCache::new(&config));
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(photos.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await
}
