use std::{path::Path, str::FromStr, time::Duration};

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::config::{app_config::AppConfig, channel_config::GlobalChannelConfig};
use crate::logger::init_logger;
use crate::services::{
    channel_sender_service::ChannelSenderService,
    communication_log_service::CommunicationLogService,
    credential_service::ChannelCredentialService, delivery_service::DeliveryService,
    directory_service::DirectoryService, webhook_service::WebhookService,
};

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(database_url: &str) -> anyhow::Result<Pool<Sqlite>> {
    // 1) Crear la carpeta del archivo si hace falta (sqlite:data/x.db)
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if !path.starts_with(":memory:") {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    log::info!("Conectando a SQLite en {}", database_url);

    // 2) Conectarnos con SQLx
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // 3) Migraciones
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    Ok(db_pool)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let app_config = AppConfig::from_env();
    let global_channels = GlobalChannelConfig::from_env();

    let db_pool = match setup_database(&app_config.database_url).await {
        Ok(pool) => pool,
        Err(e) => panic!("No se pudo inicializar la base de datos: {:?}", e),
    };

    let http_client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(app_config.http_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => panic!("No se pudo construir el cliente HTTP: {:?}", e),
    };

    let directory_service = DirectoryService::new(db_pool.clone());
    let log_service = CommunicationLogService::new(db_pool.clone());
    let credential_service = ChannelCredentialService::new(directory_service.clone(), global_channels);

    let sender_service = ChannelSenderService::new(
        directory_service.clone(),
        credential_service.clone(),
        log_service.clone(),
    )
    .with_default_transports(http_client);

    let delivery_service = DeliveryService::new(sender_service, app_config.max_concurrent_buckets);
    let webhook_service = WebhookService::new(
        delivery_service.clone(),
        app_config.zoom_webhook_secret.clone(),
    );
    if app_config.zoom_webhook_secret.is_none() {
        log::warn!("ZOOM_WEBHOOK_SECRET_TOKEN no configurado; el handshake de Zoom fallará");
    }

    // Levantar servidor
    log::info!("Levantando servidor en {}:{}", app_config.host, app_config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(directory_service.clone()))
            .app_data(web::Data::new(log_service.clone()))
            .app_data(web::Data::new(credential_service.clone()))
            .app_data(web::Data::new(delivery_service.clone()))
            .app_data(web::Data::new(webhook_service.clone()))
            .configure(app::init_app)
    })
    .bind((app_config.host.as_str(), app_config.port))?
    .run()
    .await
}
