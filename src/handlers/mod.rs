//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers HTTP.

use actix_web::HttpResponse;
use serde_json::json;

use crate::errors::{ValidationError, WebhookError};

pub mod communication_handler;
pub mod directory_handler;
pub mod webhook_handler;

/// Traduce un error de servicio a respuesta: validación -> 400, resto -> 500.
pub(crate) fn error_response(e: anyhow::Error) -> HttpResponse {
    if let Some(validation) = e.downcast_ref::<ValidationError>() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": validation.to_string()
        }));
    }
    if let Some(webhook) = e.downcast_ref::<WebhookError>() {
        if !matches!(webhook, WebhookError::SecretNotConfigured) {
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": webhook.to_string()
            }));
        }
    }

    log::error!("(error_response) {:?}", e);
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": format!("{:#}", e)
    }))
}
