//! tests/mod.rs
//! Utilidades compartidas por las pruebas: DB temporal, fixtures y un
//! transporte simulado.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

use crate::{
    config::channel_config::GlobalChannelConfig,
    models::{
        channel_model::Channel,
        communication_model::{DeliveryReport, OutboundMessage, Recipient},
        credentials_model::ChannelCredentials,
        directory_model::{Company, CreateCompanyRequest, CreateEmployeeRequest, Employee},
    },
    services::{
        channel_sender_service::{ChannelSenderService, ChannelTransport},
        communication_log_service::CommunicationLogService,
        credential_service::ChannelCredentialService,
        delivery_service::DeliveryService,
        directory_service::DirectoryService,
    },
};

mod handler_tests;
mod transport_tests;

/// Credenciales globales falsas pero completas para los cuatro canales.
pub fn test_globals() -> GlobalChannelConfig {
    test_globals_with(|_| None)
}

/// Igual que `test_globals`, con la posibilidad de pisar variables.
pub fn test_globals_with<F>(overrides: F) -> GlobalChannelConfig
where
    F: Fn(&str) -> Option<String>,
{
    GlobalChannelConfig::from_lookup(|key| {
        overrides(key).or_else(|| {
            let value = match key {
                "WHATSAPP_ACCESS_TOKEN" => "wa-global-token",
                "WHATSAPP_PHONE_NUMBER_ID" => "1000",
                "TELEGRAM_BOT_TOKEN" => "tg-global-token",
                "BREVO_API_KEY" => "brevo-global-key",
                "BREVO_SMS_SENDER" => "Acme",
                "BREVO_SENDER_EMAIL" => "noreply@acme.test",
                _ => return None,
            };
            Some(value.to_string())
        })
    })
}

/// Empleado en memoria (sin DB) para pruebas de agrupación.
pub fn employee(
    id: &str,
    company_id: &str,
    email: Option<&str>,
    phone: Option<&str>,
    telegram_id: Option<&str>,
) -> Employee {
    Employee {
        id: id.to_string(),
        name: format!("Empleado {}", id),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
        telegram_id: telegram_id.map(str::to_string),
        company_id: company_id.to_string(),
        department: None,
        level: None,
        work_mode: None,
        created_at: Utc::now(),
    }
}

/// DB SQLite en un directorio temporal, con migraciones aplicadas.
/// El `TempDir` debe vivir mientras se use el pool.
pub async fn test_pool() -> (TempDir, Pool<Sqlite>) {
    let dir = tempfile::tempdir().expect("No se pudo crear tempdir");
    let db_url = format!("sqlite:{}", dir.path().join("test.db").display());
    let pool = crate::setup_database(&db_url)
        .await
        .expect("No se pudo inicializar la DB de pruebas");
    (dir, pool)
}

pub struct TestContext {
    _dir: TempDir,
    pub directory: DirectoryService,
    pub logs: CommunicationLogService,
    pub credentials: ChannelCredentialService,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_globals(test_globals()).await
    }

    pub async fn with_globals(globals: GlobalChannelConfig) -> Self {
        let (dir, pool) = test_pool().await;
        let directory = DirectoryService::new(pool.clone());
        let logs = CommunicationLogService::new(pool);
        let credentials = ChannelCredentialService::new(directory.clone(), globals);
        TestContext {
            _dir: dir,
            directory,
            logs,
            credentials,
        }
    }

    pub fn sender(&self) -> ChannelSenderService {
        ChannelSenderService::new(
            self.directory.clone(),
            self.credentials.clone(),
            self.logs.clone(),
        )
    }

    /// Router con los transportes indicados (los demás canales quedan sin transporte).
    pub fn router(&self, transports: &[Arc<MockTransport>], max_concurrent: usize) -> DeliveryService {
        let sender = transports.iter().fold(self.sender(), |sender, transport| {
            sender.with_transport(transport.clone() as Arc<dyn ChannelTransport>)
        });
        DeliveryService::new(sender, max_concurrent)
    }

    pub async fn company(&self, name: &str, fallback_config: Option<Vec<Channel>>) -> Company {
        self.directory
            .create_company(CreateCompanyRequest {
                name: name.to_string(),
                email_config: None,
                sms_config: None,
                whatsapp_config: None,
                telegram_config: None,
                fallback_config,
            })
            .await
            .expect("No se pudo crear company")
    }

    pub async fn employee(
        &self,
        company_id: &str,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        telegram_id: Option<&str>,
    ) -> Employee {
        self.directory
            .create_employee(CreateEmployeeRequest {
                name: name.to_string(),
                email: email.map(str::to_string),
                phone: phone.map(str::to_string),
                telegram_id: telegram_id.map(str::to_string),
                company_id: company_id.to_string(),
                department: None,
                level: None,
                work_mode: None,
            })
            .await
            .expect("No se pudo crear employee")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    Deliver,
    RejectEach,
    Unavailable,
}

/// Una llamada recibida por el transporte simulado.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub addresses: Vec<String>,
    pub body: String,
    pub credentials: ChannelCredentials,
}

pub struct MockTransport {
    channel: Channel,
    behavior: MockBehavior,
    pub calls: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    pub fn new(channel: Channel, behavior: MockBehavior) -> Arc<Self> {
        Arc::new(MockTransport {
            channel,
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn all(behavior: MockBehavior) -> Vec<Arc<Self>> {
        [Channel::Whatsapp, Channel::Telegram, Channel::Sms, Channel::Email]
            .into_iter()
            .map(|ch| MockTransport::new(ch, behavior))
            .collect()
    }

    pub fn recorded(&self) -> Vec<MockCall> {
        self.calls.lock().expect("mutex envenenado").clone()
    }
}

#[async_trait]
impl ChannelTransport for MockTransport {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn deliver(
        &self,
        credentials: &ChannelCredentials,
        recipients: &[Recipient],
        message: &OutboundMessage,
    ) -> Result<DeliveryReport> {
        self.calls.lock().expect("mutex envenenado").push(MockCall {
            addresses: recipients.iter().map(|r| r.address.clone()).collect(),
            body: message.body.clone(),
            credentials: credentials.clone(),
        });

        let mut report = DeliveryReport::default();
        match self.behavior {
            MockBehavior::Deliver => {
                for r in recipients {
                    report.record(&r.employee_id, Ok(()));
                }
            }
            MockBehavior::RejectEach => {
                for r in recipients {
                    report.record(&r.employee_id, Err(anyhow!("rechazado por el proveedor")));
                }
            }
            MockBehavior::Unavailable => return Err(anyhow!("proveedor caído")),
        }
        Ok(report)
    }
}
