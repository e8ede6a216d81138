//! handlers/webhook_handler.rs
//! Receptores de webhooks de plataformas de reuniones.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    handlers::error_response,
    models::webhook_model::WebhookSource,
    services::webhook_service::{WebhookReply, WebhookService},
};

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    user_id: Option<String>,
    /// Handshake de suscripción de Microsoft Graph
    #[serde(rename = "validationToken")]
    validation_token: Option<String>,
}

/// POST /api/webhooks/zoom
pub async fn zoom_webhook_endpoint(
    webhook_service: web::Data<WebhookService>,
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
) -> HttpResponse {
    process_webhook(WebhookSource::Zoom, &webhook_service, &query, &body).await
}

/// POST /api/webhooks/google-meet
pub async fn google_meet_webhook_endpoint(
    webhook_service: web::Data<WebhookService>,
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
) -> HttpResponse {
    process_webhook(WebhookSource::GoogleMeet, &webhook_service, &query, &body).await
}

/// POST /api/webhooks/microsoft365
pub async fn microsoft365_webhook_endpoint(
    webhook_service: web::Data<WebhookService>,
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
) -> HttpResponse {
    if let Some(token) = &query.validation_token {
        log::info!("(microsoft365_webhook_endpoint) Respondiendo validationToken de Graph");
        return HttpResponse::Ok()
            .content_type("text/plain")
            .body(token.clone());
    }
    process_webhook(WebhookSource::Microsoft365, &webhook_service, &query, &body).await
}

/// Cualquier método distinto de POST en /api/webhooks/*
pub async fn method_not_allowed_endpoint() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header(("Allow", "POST"))
        .json(json!({
            "success": false,
            "error": "Método no permitido"
        }))
}

async fn process_webhook(
    source: WebhookSource,
    webhook_service: &WebhookService,
    query: &WebhookQuery,
    body: &[u8],
) -> HttpResponse {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("(process_webhook) Body inválido desde {}: {}", source.as_str(), e);
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": format!("Body JSON inválido: {}", e)
            }));
        }
    };

    match webhook_service
        .handle_event(source, &payload, query.user_id.as_deref())
        .await
    {
        Ok(WebhookReply::ZoomValidation(resp)) => HttpResponse::Ok().json(resp),
        Ok(WebhookReply::Ignored { event_type }) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Evento '{}' ignorado", event_type)
        })),
        Ok(WebhookReply::Notified { event_type, result }) if result.success => {
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": format!(
                    "Notificación de '{}' enviada a {} de {} destinatarios",
                    event_type, result.successful, result.total
                )
            }))
        }
        Ok(WebhookReply::Notified { event_type, result }) => {
            log::error!(
                "(process_webhook) Notificación de '{}' no entregada: {:?}",
                event_type,
                result.error
            );
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": format!("No se pudo entregar la notificación de '{}'", event_type)
            }))
        }
        Err(e) => error_response(e),
    }
}
