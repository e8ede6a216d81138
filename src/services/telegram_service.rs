use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    models::{
        channel_model::Channel,
        communication_model::{DeliveryReport, OutboundMessage, Recipient},
        credentials_model::{ChannelCredentials, TelegramCredentials},
    },
    services::channel_sender_service::{ensure_success, ChannelTransport},
};

/// Telegram Bot API (`sendMessage`).
#[derive(Clone)]
pub struct TelegramService {
    http_client: Client,
}

impl TelegramService {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn send_message(&self, creds: &TelegramCredentials, chat_id: &str, text: &str) -> Result<()> {
        let send_url = format!(
            "{}/bot{}/sendMessage",
            creds.api_url.trim_end_matches('/'),
            creds.bot_token
        );
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true
        });

        let resp = self
            .http_client
            .post(&send_url)
            .json(&payload)
            .send()
            .await
            .context("(send_via_telegram) Fallo al POST sendMessage")?;
        let resp = ensure_success(resp, "Telegram Bot API").await?;

        // La Bot API puede responder 200 con ok=false
        let json_val = resp.json::<Value>().await.unwrap_or(Value::Null);
        if json_val.get("ok").and_then(Value::as_bool) == Some(false) {
            let description = json_val
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("sin descripción");
            return Err(anyhow!("Telegram rechazó el mensaje: {}", description));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelTransport for TelegramService {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        let ChannelCredentials::Telegram(creds) = credentials else {
            bail!(
                "Credenciales de {} pasadas al transporte de Telegram",
                credentials.channel()
            );
        };

        let mut report = DeliveryReport::default();
        for recipient in recipients {
            let result = self
                .send_message(creds, recipient.address.trim(), &message.body)
                .await;
            if let Err(e) = &result {
                log::error!(
                    "(send_via_telegram) -> Fallo al enviar a empleado {}: {:#}",
                    recipient.employee_id,
                    e
                );
            }
            report.record(&recipient.employee_id, result);
        }
        Ok(report)
    }
}
