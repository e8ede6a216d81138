//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod channel_sender_service;
pub mod communication_log_service;
pub mod credential_service;
pub mod delivery_service;
pub mod directory_service;
pub mod email_service;
pub mod grouping_service;
pub mod sms_service;
pub mod telegram_service;
pub mod webhook_service;
pub mod whatsapp_service;
