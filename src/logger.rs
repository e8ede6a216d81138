//! logger.rs
//! Configuración del logger usando env_logger.

use log::LevelFilter;

pub fn init_logger() {
    // RUST_LOG manda; si no está, "info".
    let log_env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    env_logger::Builder::new()
        // sqlx loguea cada query en info
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_filters(&log_env)
        .format_timestamp_secs()
        .init();
}
