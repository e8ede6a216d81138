//! config/mod.rs
//! Configuración cargada desde variables de entorno (.env vía dotenv).

pub mod app_config;
pub mod channel_config;
