//! services/webhook_service.rs
//! Traduce eventos de Zoom, Google Meet y Microsoft 365 en notificaciones
//! de WhatsApp.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::{
    errors::WebhookError,
    models::{
        communication_model::{AggregateResult, SendOptions},
        webhook_model::{WebhookAction, WebhookSource, ZoomValidationResponse},
    },
    services::delivery_service::DeliveryService,
};

const ZOOM_URL_VALIDATION: &str = "endpoint.url_validation";

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeetingEvent {
    Scheduled,
    Updated,
    Cancelled,
    Started,
    Ended,
    ParticipantJoined,
    RecordingReady,
}

/// Campos comunes que nos interesan de cualquier plataforma.
#[derive(Debug, Default)]
struct MeetingInfo {
    title: Option<String>,
    join_url: Option<String>,
    start_time: Option<String>,
    participant: Option<String>,
}

/// Resultado de procesar un webhook.
#[derive(Debug)]
pub enum WebhookReply {
    Notified {
        event_type: String,
        result: AggregateResult,
    },
    Ignored {
        event_type: String,
    },
    ZoomValidation(ZoomValidationResponse),
}

#[derive(Clone)]
pub struct WebhookService {
    delivery: DeliveryService,
    zoom_secret: Option<String>,
}

impl WebhookService {
    pub fn new(delivery: DeliveryService, zoom_secret: Option<String>) -> Self {
        Self {
            delivery,
            zoom_secret,
        }
    }

    pub async fn handle_event(
        &self,
        source: WebhookSource,
        body: &Value,
        query_user_id: Option<&str>,
    ) -> Result<WebhookReply> {
        match parse_webhook(source, body, query_user_id)? {
            WebhookAction::ZoomUrlValidation { plain_token } => {
                let secret = self
                    .zoom_secret
                    .as_deref()
                    .ok_or(WebhookError::SecretNotConfigured)?;
                let encrypted_token = zoom_encrypted_token(secret, &plain_token)?;
                Ok(WebhookReply::ZoomValidation(ZoomValidationResponse {
                    plain_token,
                    encrypted_token,
                }))
            }
            WebhookAction::Ignore { event_type } => {
                log::info!(
                    "(handle_event) {} evento '{}' sin notificación asociada",
                    source.as_str(),
                    event_type
                );
                Ok(WebhookReply::Ignored { event_type })
            }
            WebhookAction::Notify {
                event_type,
                recipient_ids,
                message,
            } => {
                log::info!(
                    "(handle_event) {} evento '{}' -> WhatsApp a {} destinatarios",
                    source.as_str(),
                    event_type,
                    recipient_ids.len()
                );
                let options = SendOptions {
                    sender_id: format!("webhook:{}", source.as_str()),
                };
                let result = self
                    .delivery
                    .send_whatsapp_message(&recipient_ids, &message, &options)
                    .await?;
                Ok(WebhookReply::Notified { event_type, result })
            }
        }
    }
}

/// Valida el payload y decide qué hacer con él. No hace I/O.
pub fn parse_webhook(
    source: WebhookSource,
    body: &Value,
    query_user_id: Option<&str>,
) -> Result<WebhookAction, WebhookError> {
    if !body.is_object() {
        return Err(WebhookError::InvalidPayload("el body debe ser un objeto JSON".into()));
    }
    let event_type = str_field(body, "event")
        .or_else(|| str_field(body, "type"))
        .ok_or(WebhookError::MissingEventType)?;

    if source == WebhookSource::Zoom && event_type == ZOOM_URL_VALIDATION {
        let plain_token = body
            .pointer("/payload/plainToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WebhookError::InvalidPayload("falta payload.plainToken".into()))?;
        return Ok(WebhookAction::ZoomUrlValidation {
            plain_token: plain_token.to_string(),
        });
    }

    let Some(event) = classify_event(source, &event_type) else {
        return Ok(WebhookAction::Ignore { event_type });
    };

    let recipient_ids = collect_recipients(body, query_user_id);
    if recipient_ids.is_empty() {
        return Err(WebhookError::MissingRecipient);
    }

    let info = extract_meeting_info(source, body);
    Ok(WebhookAction::Notify {
        message: render_message(source, event, &info),
        event_type,
        recipient_ids,
    })
}

/// `encryptedToken` del handshake de Zoom: HMAC-SHA256(secret, plainToken) en hex.
pub fn zoom_encrypted_token(secret: &str, plain_token: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("Clave HMAC inválida: {}", e))?;
    mac.update(plain_token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn classify_event(source: WebhookSource, event_type: &str) -> Option<MeetingEvent> {
    let event = match (source, event_type) {
        (WebhookSource::Zoom, "meeting.created") => MeetingEvent::Scheduled,
        (WebhookSource::Zoom, "meeting.updated") => MeetingEvent::Updated,
        (WebhookSource::Zoom, "meeting.deleted") => MeetingEvent::Cancelled,
        (WebhookSource::Zoom, "meeting.started") => MeetingEvent::Started,
        (WebhookSource::Zoom, "meeting.ended") => MeetingEvent::Ended,
        (WebhookSource::Zoom, "meeting.participant_joined") => MeetingEvent::ParticipantJoined,
        (WebhookSource::Zoom, "recording.completed") => MeetingEvent::RecordingReady,

        (WebhookSource::GoogleMeet, "meeting.scheduled" | "meeting.created") => {
            MeetingEvent::Scheduled
        }
        (WebhookSource::GoogleMeet, "conference.started" | "meeting.started") => {
            MeetingEvent::Started
        }
        (WebhookSource::GoogleMeet, "conference.ended" | "meeting.ended") => MeetingEvent::Ended,
        (WebhookSource::GoogleMeet, "participant.joined") => MeetingEvent::ParticipantJoined,
        (WebhookSource::GoogleMeet, "recording.fileGenerated") => MeetingEvent::RecordingReady,

        (WebhookSource::Microsoft365, "meeting.created" | "event.created") => {
            MeetingEvent::Scheduled
        }
        (WebhookSource::Microsoft365, "meeting.updated" | "event.updated") => {
            MeetingEvent::Updated
        }
        (WebhookSource::Microsoft365, "meeting.cancelled" | "event.deleted") => {
            MeetingEvent::Cancelled
        }
        (WebhookSource::Microsoft365, "meeting.started" | "callStarted") => MeetingEvent::Started,
        (WebhookSource::Microsoft365, "meeting.ended" | "callEnded") => MeetingEvent::Ended,
        (WebhookSource::Microsoft365, "participant.joined") => MeetingEvent::ParticipantJoined,
        _ => return None,
    };
    Some(event)
}

fn extract_meeting_info(source: WebhookSource, body: &Value) -> MeetingInfo {
    match source {
        WebhookSource::Zoom => {
            let object = body.pointer("/payload/object").unwrap_or(&NULL);
            MeetingInfo {
                title: str_field(object, "topic"),
                join_url: str_field(object, "join_url"),
                start_time: str_field(object, "start_time"),
                participant: object
                    .get("participant")
                    .and_then(|p| str_field(p, "user_name")),
            }
        }
        WebhookSource::GoogleMeet => {
            let meeting = body
                .get("meeting")
                .or_else(|| body.get("conference"))
                .unwrap_or(&NULL);
            MeetingInfo {
                title: first_str(meeting, &["title", "name", "summary"]),
                join_url: first_str(meeting, &["meeting_uri", "meetingUri", "hangoutLink"]),
                start_time: first_str(meeting, &["start_time", "startTime"]),
                participant: body
                    .get("participant")
                    .and_then(|p| first_str(p, &["name", "displayName"])),
            }
        }
        WebhookSource::Microsoft365 => {
            let meeting = body
                .get("meeting")
                .or_else(|| body.get("resourceData"))
                .unwrap_or(&NULL);
            MeetingInfo {
                title: first_str(meeting, &["subject", "title"]),
                join_url: first_str(meeting, &["joinUrl", "joinWebUrl", "join_url"]),
                start_time: meeting
                    .pointer("/start/dateTime")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| first_str(meeting, &["start_time", "startDateTime"])),
                participant: body
                    .get("participant")
                    .and_then(|p| first_str(p, &["displayName", "name"])),
            }
        }
    }
}

fn render_message(source: WebhookSource, event: MeetingEvent, info: &MeetingInfo) -> String {
    let platform = match source {
        WebhookSource::Zoom => "Zoom",
        WebhookSource::GoogleMeet => "Google Meet",
        WebhookSource::Microsoft365 => "Microsoft Teams",
    };
    let title = info.title.as_deref().unwrap_or("reunión");

    let mut text = match event {
        MeetingEvent::Scheduled => match &info.start_time {
            Some(start) => format!("Nueva reunión de {} \"{}\" programada para {}.", platform, title, start),
            None => format!("Nueva reunión de {} \"{}\" programada.", platform, title),
        },
        MeetingEvent::Updated => format!("La reunión de {} \"{}\" fue actualizada.", platform, title),
        MeetingEvent::Cancelled => format!("La reunión de {} \"{}\" fue cancelada.", platform, title),
        MeetingEvent::Started => format!("Tu reunión de {} \"{}\" ha comenzado.", platform, title),
        MeetingEvent::Ended => format!("Tu reunión de {} \"{}\" ha terminado.", platform, title),
        MeetingEvent::ParticipantJoined => format!(
            "{} se unió a tu reunión de {} \"{}\".",
            info.participant.as_deref().unwrap_or("Un participante"),
            platform,
            title
        ),
        MeetingEvent::RecordingReady => {
            format!("La grabación de \"{}\" ({}) está lista.", title, platform)
        }
    };

    let wants_link = matches!(
        event,
        MeetingEvent::Scheduled | MeetingEvent::Updated | MeetingEvent::Started
    );
    if let (true, Some(url)) = (wants_link, &info.join_url) {
        text.push_str(&format!("\nUnirse: {}", url));
    }
    text
}

/// `recipient_ids` y `user_id` del body, más `?user_id=` de la query.
fn collect_recipients(body: &Value, query_user_id: Option<&str>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    };

    if let Some(list) = body.get("recipient_ids").and_then(Value::as_array) {
        list.iter().filter_map(Value::as_str).for_each(&mut push);
    }
    if let Some(user_id) = body.get("user_id").and_then(Value::as_str) {
        push(user_id);
    }
    if let Some(user_id) = query_user_id {
        push(user_id);
    }
    ids
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| str_field(value, key))
}
