//! models/directory_model.rs
//! Empleados y empresas (el "directorio" que consume el router).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::channel_model::Channel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub company_id: String,
    pub department: Option<String>,
    pub level: Option<String>,
    pub work_mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// Dato de contacto que usa cada canal. Strings vacíos cuentan como ausentes.
    pub fn contact_for(&self, channel: Channel) -> Option<&str> {
        let raw = match channel {
            Channel::Whatsapp | Channel::Sms => self.phone.as_deref(),
            Channel::Telegram => self.telegram_id.as_deref(),
            Channel::Email => self.email.as_deref(),
        };
        raw.map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub email_config: Option<Value>,
    pub sms_config: Option<Value>,
    pub whatsapp_config: Option<Value>,
    pub telegram_config: Option<Value>,
    /// Orden de fallback propio de la empresa (None => orden por defecto)
    pub fallback_config: Option<Vec<Channel>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Bloque de configuración de la empresa para un canal.
    pub fn channel_config(&self, channel: Channel) -> Option<&Value> {
        match channel {
            Channel::Whatsapp => self.whatsapp_config.as_ref(),
            Channel::Telegram => self.telegram_config.as_ref(),
            Channel::Sms => self.sms_config.as_ref(),
            Channel::Email => self.email_config.as_ref(),
        }
    }
}

/// Request para crear una empresa
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub email_config: Option<Value>,
    pub sms_config: Option<Value>,
    pub whatsapp_config: Option<Value>,
    pub telegram_config: Option<Value>,
    pub fallback_config: Option<Vec<Channel>>,
}

/// Request para actualizar una empresa. Los campos ausentes no se tocan;
/// un `null` explícito borra la config (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub email_config: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub sms_config: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub whatsapp_config: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub telegram_config: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub fallback_config: Option<Option<Vec<Channel>>>,
}

/// Campo presente en el JSON: `null` -> `Some(None)`, valor -> `Some(Some(v))`.
/// La ausencia la cubre `#[serde(default)]`.
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub company_id: String,
    pub department: Option<String>,
    pub level: Option<String>,
    pub work_mode: Option<String>,
}

/// Filtros del listado de empleados (todos opcionales)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub company_id: Option<String>,
    pub department: Option<String>,
    pub level: Option<String>,
    pub work_mode: Option<String>,
}
