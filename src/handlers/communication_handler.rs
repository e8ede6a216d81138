//! handlers/communication_handler.rs
use actix_web::{web, HttpResponse};

use crate::{
    handlers::error_response,
    models::communication_model::{
        LogQuery, OutboundMessage, SendCommunicationRequest, SendOptions, SendWhatsAppRequest,
    },
    services::{
        communication_log_service::CommunicationLogService, delivery_service::DeliveryService,
    },
};

fn options_for(sender_id: Option<String>) -> SendOptions {
    match sender_id.filter(|s| !s.trim().is_empty()) {
        Some(sender_id) => SendOptions { sender_id },
        None => SendOptions::default(),
    }
}

/// POST /api/communications/send
pub async fn send_communication_endpoint(
    delivery_service: web::Data<DeliveryService>,
    body: web::Json<SendCommunicationRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let message = OutboundMessage {
        subject: req.subject,
        body: req.message,
    };
    let options = options_for(req.sender_id);

    match delivery_service
        .send_with_fallback(
            &req.recipient_ids,
            &message,
            req.primary_channel,
            req.fallback_order.as_deref(),
            &options,
        )
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(e),
    }
}

/// POST /api/communications/whatsapp
pub async fn send_whatsapp_endpoint(
    delivery_service: web::Data<DeliveryService>,
    body: web::Json<SendWhatsAppRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let options = options_for(req.sender_id);

    match delivery_service
        .send_whatsapp_message(&req.recipient_ids, &req.message, &options)
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(e),
    }
}

/// GET /api/communications/logs
pub async fn list_logs_endpoint(
    log_service: web::Data<CommunicationLogService>,
    query: web::Query<LogQuery>,
) -> HttpResponse {
    match log_service.list_logs(&query).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}
