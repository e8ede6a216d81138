//! config/app_config.rs
//! Parámetros del servidor y del router.

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Buckets (empresa, canal) despachados a la vez. 1 = secuencial.
    pub max_concurrent_buckets: usize,
    pub http_timeout_secs: u64,
    pub zoom_webhook_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 5022,
            database_url: "sqlite:data/communications.db".to_string(),
            max_concurrent_buckets: 1,
            http_timeout_secs: 30,
            zoom_webhook_secret: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            host: env::var("APP_HOST").unwrap_or(defaults.host),
            port: parse_var("APP_PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_concurrent_buckets: parse_var("MAX_CONCURRENT_BUCKETS", defaults.max_concurrent_buckets)
                .max(1),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            zoom_webhook_secret: env::var("ZOOM_WEBHOOK_SECRET_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

fn parse_var<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("(AppConfig) Valor inválido para {}='{}', usando default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
