use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSource {
    Zoom,
    GoogleMeet,
    Microsoft365,
}

impl WebhookSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookSource::Zoom => "zoom",
            WebhookSource::GoogleMeet => "google-meet",
            WebhookSource::Microsoft365 => "microsoft365",
        }
    }
}

/// Qué hacer con un evento recibido.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAction {
    /// Mandar una notificación por WhatsApp
    Notify {
        event_type: String,
        recipient_ids: Vec<String>,
        message: String,
    },
    /// Evento válido pero sin notificación asociada
    Ignore { event_type: String },
    /// Handshake `endpoint.url_validation` de Zoom
    ZoomUrlValidation { plain_token: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZoomValidationResponse {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
    #[serde(rename = "encryptedToken")]
    pub encrypted_token: String,
}
