//! services/channel_sender_service.rs
//! Envío de un lote (empresa, canal): resuelve destinatarios y credenciales,
//! deja el log y delega la llamada externa al transporte del canal.

use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::{
    models::{
        channel_model::Channel,
        communication_model::{
            DeliveryReport, LogStatus, NewCommunicationLog, OutboundMessage, Recipient,
            RecipientFailure, SendOptions, SendOutcome,
        },
        credentials_model::ChannelCredentials,
        directory_model::Employee,
    },
    services::{
        communication_log_service::CommunicationLogService,
        credential_service::ChannelCredentialService, directory_service::DirectoryService,
        email_service::EmailService, sms_service::SmsService, telegram_service::TelegramService,
        whatsapp_service::WhatsAppService,
    },
};

/// Adaptador hacia la API externa de un canal.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    fn channel(&self) -> Channel;

    /// Envía a cada destinatario. Un error por destinatario va al reporte;
    /// `Err` significa que no se pudo enviar a nadie.
    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport>;
}

#[derive(Clone)]
pub struct ChannelSenderService {
    directory: DirectoryService,
    credentials: ChannelCredentialService,
    logs: CommunicationLogService,
    transports: Arc<HashMap<Channel, Arc<dyn ChannelTransport>>>,
}

impl ChannelSenderService {
    pub fn new(
        directory: DirectoryService,
        credentials: ChannelCredentialService,
        logs: CommunicationLogService,
    ) -> Self {
        Self {
            directory,
            credentials,
            logs,
            transports: Arc::new(HashMap::new()),
        }
    }

    /// Registra los transportes reales (WhatsApp Cloud API, Telegram, Brevo, SMTP).
    pub fn with_default_transports(self, http_client: Client) -> Self {
        self.with_transport(Arc::new(WhatsAppService::new(http_client.clone())))
            .with_transport(Arc::new(TelegramService::new(http_client.clone())))
            .with_transport(Arc::new(SmsService::new(http_client.clone())))
            .with_transport(Arc::new(EmailService::new(http_client)))
    }

    pub fn with_transport(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        Arc::make_mut(&mut self.transports).insert(transport.channel(), transport);
        self
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    /// Envía a una lista de IDs de una empresa por un canal concreto.
    pub async fn send(
        &self,
        channel: Channel,
        company_id: &str,
        recipient_ids: &[String],
        message: &OutboundMessage,
        options: &SendOptions,
    ) -> SendOutcome {
        let employees = match self.directory.get_employees_by_ids(recipient_ids).await {
            Ok(list) => list,
            Err(e) => {
                log::error!(
                    "(send) No se pudieron cargar destinatarios para company={}: {:#}",
                    company_id,
                    e
                );
                return failed_outcome(company_id, channel, recipient_ids.len(), format!("{:#}", e));
            }
        };

        let (in_company, others): (Vec<Employee>, Vec<Employee>) = employees
            .into_iter()
            .partition(|emp| emp.company_id == company_id);

        let mut outcome = self
            .send_to_employees(channel, company_id, &in_company, message, options)
            .await;

        // IDs inexistentes o de otra empresa
        for id in recipient_ids {
            if !in_company.iter().any(|emp| &emp.id == id) {
                let reason = if others.iter().any(|emp| &emp.id == id) {
                    format!("Empleado no pertenece a company={}", company_id)
                } else {
                    "Empleado no encontrado".to_string()
                };
                outcome.failures.push(RecipientFailure {
                    employee_id: id.clone(),
                    error: reason,
                });
                outcome.failed += 1;
                outcome.recipient_count += 1;
                outcome.success = false;
            }
        }
        outcome
    }

    /// Envía a empleados ya cargados (todos de `company_id`).
    pub async fn send_to_employees(
        &self,
        channel: Channel,
        company_id: &str,
        employees: &[Employee],
        message: &OutboundMessage,
        options: &SendOptions,
    ) -> SendOutcome {
        log::info!(
            "(send_to_employees) company={} canal={} destinatarios={}",
            company_id,
            channel,
            employees.len()
        );

        // 1) Resolver dirección de cada destinatario
        let mut recipients = Vec::with_capacity(employees.len());
        let mut failures = Vec::new();
        for emp in employees {
            match emp.contact_for(channel) {
                Some(address) => recipients.push(Recipient {
                    employee_id: emp.id.clone(),
                    name: emp.name.clone(),
                    address: address.to_string(),
                }),
                None => failures.push(RecipientFailure {
                    employee_id: emp.id.clone(),
                    error: format!("Sin dato de contacto para {}", channel),
                }),
            }
        }

        if recipients.is_empty() {
            let mut outcome = failed_outcome(
                company_id,
                channel,
                employees.len(),
                "Ningún destinatario con dato de contacto".to_string(),
            );
            outcome.failures = failures;
            return outcome;
        }

        // 2) Un log por lote, antes de enviar
        let recipient_ids: Vec<String> = employees.iter().map(|e| e.id.clone()).collect();
        let log_id = match self
            .logs
            .create_log(NewCommunicationLog {
                company_id,
                sender_id: &options.sender_id,
                recipient_ids: &recipient_ids,
                message: &message.body,
                channel,
            })
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!(
                    "(send_to_employees) No se pudo escribir communication_log (se continúa): {:#}",
                    e
                );
                None
            }
        };

        // 3) Transporte + credenciales
        let delivery = match self.transports.get(&channel) {
            None => Err(anyhow!("Canal no soportado: {}", channel)),
            Some(transport) => match self.credentials.credentials_for_send(company_id, channel).await {
                Ok(creds) => transport.deliver(&creds, &recipients, message).await,
                Err(e) => Err(e),
            },
        };

        let outcome = match delivery {
            Ok(report) => {
                failures.extend(report.failures);
                let delivered = report.delivered.len();
                SendOutcome {
                    company_id: company_id.to_string(),
                    channel,
                    success: delivered > 0 && failures.is_empty(),
                    recipient_count: employees.len(),
                    delivered,
                    failed: failures.len(),
                    log_id: log_id.clone(),
                    error: None,
                    failures,
                }
            }
            Err(e) => {
                log::error!(
                    "(send_to_employees) Falló envío company={} canal={}: {:#}",
                    company_id,
                    channel,
                    e
                );
                let mut outcome =
                    failed_outcome(company_id, channel, employees.len(), format!("{:#}", e));
                outcome.log_id = log_id.clone();
                outcome.failures = failures;
                outcome
            }
        };

        // 4) Estado final del log (best-effort)
        if let Some(id) = &log_id {
            let status = if outcome.delivered == 0 {
                LogStatus::Failed
            } else if outcome.failed == 0 {
                LogStatus::Sent
            } else {
                LogStatus::Partial
            };
            let error = outcome
                .error
                .clone()
                .or_else(|| outcome.failures.first().map(|f| f.error.clone()));
            if let Err(e) = self.logs.update_log_status(id, status, error.as_deref()).await {
                log::warn!("(send_to_employees) No se pudo actualizar log {}: {:#}", id, e);
            }
        }

        log::info!(
            "(send_to_employees) company={} canal={} -> entregados={} fallidos={}",
            company_id,
            channel,
            outcome.delivered,
            outcome.failed
        );
        outcome
    }
}

/// Bucket donde no se entregó nada.
pub fn failed_outcome(
    company_id: &str,
    channel: Channel,
    recipient_count: usize,
    error: String,
) -> SendOutcome {
    SendOutcome {
        company_id: company_id.to_string(),
        channel,
        success: false,
        recipient_count,
        delivered: 0,
        failed: recipient_count,
        log_id: None,
        error: Some(error),
        failures: Vec::new(),
    }
}

/// Falla si la respuesta no es 2xx, con el body como detalle.
pub async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body_txt = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} respondió {}: {}", what, status, body_txt))
}
