//! models/communication_model.rs
//! Estructuras de envío (requests, resultados por bucket, agregado) y
//! registros de `communication_logs`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::channel_model::Channel;

pub const DEFAULT_SENDER_ID: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Sent,
    Partial,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Pending => "pending",
            LogStatus::Sent => "sent",
            LogStatus::Partial => "partial",
            LogStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationLogRecord {
    pub id: String,
    pub company_id: String,
    pub sender_id: String,
    pub recipient_ids: Vec<String>,
    pub message: String,
    pub channel: Channel,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos para insertar un log (uno por lote)
#[derive(Debug, Clone)]
pub struct NewCommunicationLog<'a> {
    pub company_id: &'a str,
    pub sender_id: &'a str,
    pub recipient_ids: &'a [String],
    pub message: &'a str,
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    pub company_id: Option<String>,
    pub channel: Option<Channel>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListLogsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<CommunicationLogRecord>,
}

/// Mensaje saliente. `subject` solo lo usa Email.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub subject: Option<String>,
    pub body: String,
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendOptions {
    pub sender_id: String,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            sender_id: DEFAULT_SENDER_ID.to_string(),
        }
    }
}

/// Destinatario ya resuelto para un canal concreto.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub employee_id: String,
    pub name: String,
    /// teléfono, chat_id de Telegram o email, según el canal
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientFailure {
    pub employee_id: String,
    pub error: String,
}

/// Resultado de un transporte para un lote.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failures: Vec<RecipientFailure>,
}

impl DeliveryReport {
    pub fn record(&mut self, employee_id: &str, result: anyhow::Result<()>) {
        match result {
            Ok(()) => self.delivered.push(employee_id.to_string()),
            Err(e) => self.failures.push(RecipientFailure {
                employee_id: employee_id.to_string(),
                error: format!("{:#}", e),
            }),
        }
    }
}

/// Resultado del envío de un bucket (empresa, canal).
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub company_id: String,
    pub channel: Channel,
    pub success: bool,
    pub recipient_count: usize,
    pub delivered: usize,
    pub failed: usize,
    pub log_id: Option<String>,
    pub error: Option<String>,
    pub failures: Vec<RecipientFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Destinatarios sin canal utilizable o inexistentes (cuentan en `failed`)
    pub unreachable: Vec<String>,
    pub success_rate: f64,
    pub by_channel: BTreeMap<Channel, ChannelSummary>,
    pub details: Vec<SendOutcome>,
    pub error: Option<String>,
}

/// POST /api/communications/send
#[derive(Debug, Clone, Deserialize)]
pub struct SendCommunicationRequest {
    pub recipient_ids: Vec<String>,
    pub message: String,
    pub subject: Option<String>,
    pub primary_channel: Channel,
    pub fallback_order: Option<Vec<Channel>>,
    pub sender_id: Option<String>,
}

/// POST /api/communications/whatsapp
#[derive(Debug, Clone, Deserialize)]
pub struct SendWhatsAppRequest {
    pub recipient_ids: Vec<String>,
    pub message: String,
    pub sender_id: Option<String>,
}
