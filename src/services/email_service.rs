//! services/email_service.rs
//! Transporte Email: Brevo (API transaccional) o SMTP con lettre, según el
//! `provider` de las credenciales.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use serde_json::json;

use crate::{
    models::{
        channel_model::Channel,
        communication_model::{DeliveryReport, OutboundMessage, Recipient},
        credentials_model::{ChannelCredentials, EmailCredentials},
    },
    services::channel_sender_service::{ensure_success, ChannelTransport},
};

const DEFAULT_SUBJECT: &str = "Nuevo mensaje";
const SMTP_SEND_TIMEOUT: Duration = Duration::from_secs(30);
const SMTPS_PORT: u16 = 465;

#[derive(Clone)]
pub struct EmailService {
    http_client: Client,
}

impl EmailService {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn send_via_brevo(
        &self,
        api_url: &str,
        api_key: &str,
        sender_email: &str,
        sender_name: Option<&str>,
        recipient: &Recipient,
        message: &OutboundMessage,
    ) -> Result<()> {
        let send_url = format!("{}/v3/smtp/email", api_url.trim_end_matches('/'));
        let mut sender = json!({ "email": sender_email });
        if let Some(name) = sender_name {
            sender["name"] = json!(name);
        }
        let payload = json!({
            "sender": sender,
            "to": [{ "email": recipient.address, "name": recipient.name }],
            "subject": message.subject.as_deref().unwrap_or(DEFAULT_SUBJECT),
            "textContent": message.body
        });

        let resp = self
            .http_client
            .post(&send_url)
            .header("api-key", api_key)
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
            .context("(send_via_email) Fallo al POST smtp/email")?;
        ensure_success(resp, "Brevo Email").await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver_via_smtp(
        &self,
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        from: Option<&str>,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        let from: Mailbox = from
            .unwrap_or(user)
            .parse()
            .context("Dirección de remitente inválida")?;

        let tls_params = TlsParameters::new(host.to_string())?;
        let tls = if port == SMTPS_PORT {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Required(tls_params)
        };
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .tls(tls)
            .build();

        // Enviar uno por uno a la lista
        let mut report = DeliveryReport::default();
        for recipient in recipients {
            let result = async {
                let to: Mailbox = recipient
                    .address
                    .parse()
                    .context("Dirección de destinatario inválida")?;
                let email = Message::builder()
                    .from(from.clone())
                    .to(to)
                    .subject(message.subject.as_deref().unwrap_or(DEFAULT_SUBJECT))
                    .header(ContentType::TEXT_PLAIN)
                    .body(message.body.clone())?;

                tokio::time::timeout(SMTP_SEND_TIMEOUT, mailer.send(email))
                    .await
                    .context("SMTP timeout")??;
                Ok::<(), anyhow::Error>(())
            }
            .await;
            log_failure(recipient, &result);
            report.record(&recipient.employee_id, result);
        }
        Ok(report)
    }
}

#[async_trait]
impl ChannelTransport for EmailService {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        let ChannelCredentials::Email(creds) = credentials else {
            bail!(
                "Credenciales de {} pasadas al transporte de Email",
                credentials.channel()
            );
        };

        match creds {
            EmailCredentials::Brevo {
                api_key,
                sender_email,
                sender_name,
                api_url,
            } => {
                log::info!(
                    "(send_via_email) Brevo: {} destinatarios, remitente={}",
                    recipients.len(),
                    sender_email
                );
                let mut report = DeliveryReport::default();
                for recipient in recipients {
                    let result = self
                        .send_via_brevo(
                            api_url,
                            api_key,
                            sender_email,
                            sender_name.as_deref(),
                            recipient,
                            message,
                        )
                        .await;
                    log_failure(recipient, &result);
                    report.record(&recipient.employee_id, result);
                }
                Ok(report)
            }
            EmailCredentials::Smtp {
                host,
                port,
                user,
                password,
                from,
            } => {
                log::info!(
                    "(send_via_email) SMTP host={}:{}, {} destinatarios",
                    host,
                    port,
                    recipients.len()
                );
                self.deliver_via_smtp(
                    host,
                    *port,
                    user,
                    password,
                    from.as_deref(),
                    recipients,
                    message,
                )
                .await
            }
        }
    }
}

fn log_failure(recipient: &Recipient, result: &Result<()>) {
    if let Err(e) = result {
        log::error!(
            "(send_via_email) -> Fallo al enviar a empleado {}: {:#}",
            recipient.employee_id,
            e
        );
    }
}
