//! errors.rs
//! Errores tipados que los handlers traducen a códigos HTTP.
//! El resto de la app trabaja con `anyhow`.

use thiserror::Error;

/// Request rechazado antes de cualquier llamada externa (HTTP 400).
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("recipient_ids debe contener al menos un id")]
    EmptyRecipients,

    #[error("El mensaje no puede estar vacío")]
    EmptyMessage,

    #[error("Campo '{0}' inválido: {1}")]
    InvalidField(String, String),
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Falta el campo 'type' o 'event'")]
    MissingEventType,

    #[error("Sin destinatarios: enviar 'recipient_ids' o 'user_id'")]
    MissingRecipient,

    #[error("Payload inválido: {0}")]
    InvalidPayload(String),

    #[error("El secret token del webhook no está configurado")]
    SecretNotConfigured,
}
