use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};

use heimdall::config::Config;
use heimdall::detection::TravelAnomalyBuilder;
use heimdall::persistence::SqliteLocationStore;

/// HTTP server entry point for the impossible-travel detector
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        match Config::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {:?}: {}", config_path, e);
                std::process::exit(1);
            }
        }
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // One shared store for the lifetime of the process.
    let store = match SqliteLocationStore::new(&config.database.path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Failed to open database {:?}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let builder = web::Data::new(TravelAnomalyBuilder::with_threshold(
        store,
        config.detection.suspicious_speed_mph,
    ));

    log::info!("Listening on {}", config.server.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(builder.clone())
            .configure(heimdall::api::configure)
    })
    .bind(config.server.bind_address.as_str())?
    .run()
    .await
}
