use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::{
    models::{
        channel_model::Channel,
        communication_model::{DeliveryReport, OutboundMessage, Recipient},
        credentials_model::{ChannelCredentials, SmsCredentials},
    },
    services::{
        channel_sender_service::{ensure_success, ChannelTransport},
        whatsapp_service::normalize_phone,
    },
};

/// SMS transaccional vía Brevo.
#[derive(Clone)]
pub struct SmsService {
    http_client: Client,
}

impl SmsService {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn send_sms(&self, creds: &SmsCredentials, recipient: &str, content: &str) -> Result<()> {
        let send_url = format!(
            "{}/v3/transactionalSMS/sms",
            creds.api_url.trim_end_matches('/')
        );
        let payload = json!({
            "type": "transactional",
            "sender": creds.sender,
            "recipient": recipient,
            "content": content
        });

        let resp = self
            .http_client
            .post(&send_url)
            .header("api-key", &creds.api_key)
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
            .context("(send_via_sms) Fallo al POST transactionalSMS")?;
        ensure_success(resp, "Brevo SMS").await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelTransport for SmsService {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        let ChannelCredentials::Sms(creds) = credentials else {
            bail!(
                "Credenciales de {} pasadas al transporte de SMS",
                credentials.channel()
            );
        };

        let mut report = DeliveryReport::default();
        for recipient in recipients {
            let result = match normalize_phone(&recipient.address) {
                Some(number) => self.send_sms(creds, &number, &message.body).await,
                None => Err(anyhow!("Teléfono inválido: '{}'", recipient.address)),
            };
            if let Err(e) = &result {
                log::error!(
                    "(send_via_sms) -> Fallo al enviar a empleado {}: {:#}",
                    recipient.employee_id,
                    e
                );
            }
            report.record(&recipient.employee_id, result);
        }
        Ok(report)
    }
}
