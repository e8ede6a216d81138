//! services/whatsapp_service.rs
//! Transporte WhatsApp sobre la Cloud API oficial (graph.facebook.com).

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::{
    models::{
        channel_model::Channel,
        communication_model::{DeliveryReport, OutboundMessage, Recipient},
        credentials_model::{ChannelCredentials, WhatsAppCredentials},
    },
    services::channel_sender_service::{ensure_success, ChannelTransport},
};

#[derive(Clone)]
pub struct WhatsAppService {
    http_client: Client,
}

impl WhatsAppService {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn send_text(&self, creds: &WhatsAppCredentials, to: &str, body: &str) -> Result<()> {
        let send_url = format!(
            "{}/{}/messages",
            creds.api_url.trim_end_matches('/'),
            creds.phone_number_id
        );
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": body
            }
        });

        let resp = self
            .http_client
            .post(&send_url)
            .bearer_auth(&creds.access_token)
            .json(&payload)
            .send()
            .await
            .context("(send_via_whatsapp) Fallo al POST de mensaje")?;
        ensure_success(resp, "WhatsApp Cloud API").await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelTransport for WhatsAppService {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        let ChannelCredentials::Whatsapp(creds) = credentials else {
            bail!(
                "Credenciales de {} pasadas al transporte de WhatsApp",
                credentials.channel()
            );
        };

        log::info!(
            "(send_via_whatsapp) Enviando texto a {} destinatarios (phone_number_id={})...",
            recipients.len(),
            creds.phone_number_id
        );

        let mut report = DeliveryReport::default();
        for recipient in recipients {
            let result = match normalize_phone(&recipient.address) {
                Some(to) => self.send_text(creds, &to, &message.body).await,
                None => Err(anyhow!("Teléfono inválido: '{}'", recipient.address)),
            };
            if let Err(e) = &result {
                log::error!(
                    "(send_via_whatsapp) -> Fallo al enviar a empleado {}: {:#}",
                    recipient.employee_id,
                    e
                );
            }
            report.record(&recipient.employee_id, result);
        }

        Ok(report)
    }
}

/// La Cloud API espera el número internacional solo con dígitos.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches("00").to_string();
    if digits.len() < 7 {
        return None;
    }
    Some(digits)
}
