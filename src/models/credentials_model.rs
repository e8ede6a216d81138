//! models/credentials_model.rs
//! Credenciales tipadas por canal. Se construyen a partir del JSON ya
//! combinado (empresa + globales) y se validan en ese mismo punto.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::models::channel_model::Channel;

pub const DEFAULT_WHATSAPP_API_URL: &str = "https://graph.facebook.com/v19.0";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

fn default_whatsapp_api_url() -> String {
    DEFAULT_WHATSAPP_API_URL.to_string()
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_brevo_api_url() -> String {
    DEFAULT_BREVO_API_URL.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

/// WhatsApp Cloud API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WhatsAppCredentials {
    pub access_token: String,
    pub phone_number_id: String,
    #[serde(default = "default_whatsapp_api_url")]
    pub api_url: String,
}

/// Telegram Bot API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelegramCredentials {
    pub bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

/// SMS transaccional de Brevo
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmsCredentials {
    pub api_key: String,
    pub sender: String,
    #[serde(default = "default_brevo_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmailCredentials {
    Brevo {
        api_key: String,
        sender_email: String,
        #[serde(default)]
        sender_name: Option<String>,
        #[serde(default = "default_brevo_api_url")]
        api_url: String,
    },
    Smtp {
        host: String,
        #[serde(default = "default_smtp_port")]
        port: u16,
        user: String,
        password: String,
        /// Si no viene, se usa `user` como remitente.
        #[serde(default)]
        from: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCredentials {
    Whatsapp(WhatsAppCredentials),
    Telegram(TelegramCredentials),
    Sms(SmsCredentials),
    Email(EmailCredentials),
}

impl ChannelCredentials {
    /// Convierte el bloque JSON del canal en credenciales tipadas.
    pub fn from_value(channel: Channel, value: Value) -> Result<Self> {
        let creds = match channel {
            Channel::Whatsapp => ChannelCredentials::Whatsapp(
                serde_json::from_value(value).context("Credenciales de WhatsApp inválidas")?,
            ),
            Channel::Telegram => ChannelCredentials::Telegram(
                serde_json::from_value(value).context("Credenciales de Telegram inválidas")?,
            ),
            Channel::Sms => ChannelCredentials::Sms(
                serde_json::from_value(value).context("Credenciales de SMS inválidas")?,
            ),
            Channel::Email => ChannelCredentials::Email(
                serde_json::from_value(value).context("Credenciales de Email inválidas")?,
            ),
        };
        creds.validate()?;
        Ok(creds)
    }

    pub fn channel(&self) -> Channel {
        match self {
            ChannelCredentials::Whatsapp(_) => Channel::Whatsapp,
            ChannelCredentials::Telegram(_) => Channel::Telegram,
            ChannelCredentials::Sms(_) => Channel::Sms,
            ChannelCredentials::Email(_) => Channel::Email,
        }
    }

    fn validate(&self) -> Result<()> {
        let channel = self.channel();
        match self {
            ChannelCredentials::Whatsapp(c) => {
                require(channel, "access_token", &c.access_token)?;
                require(channel, "phone_number_id", &c.phone_number_id)?;
                require(channel, "api_url", &c.api_url)
            }
            ChannelCredentials::Telegram(c) => {
                require(channel, "bot_token", &c.bot_token)?;
                require(channel, "api_url", &c.api_url)
            }
            ChannelCredentials::Sms(c) => {
                require(channel, "api_key", &c.api_key)?;
                require(channel, "sender", &c.sender)?;
                require(channel, "api_url", &c.api_url)
            }
            ChannelCredentials::Email(EmailCredentials::Brevo {
                api_key,
                sender_email,
                api_url,
                ..
            }) => {
                require(channel, "api_key", api_key)?;
                require(channel, "sender_email", sender_email)?;
                require(channel, "api_url", api_url)
            }
            ChannelCredentials::Email(EmailCredentials::Smtp {
                host,
                user,
                password,
                ..
            }) => {
                require(channel, "host", host)?;
                require(channel, "user", user)?;
                require(channel, "password", password)
            }
        }
    }
}

fn require(channel: Channel, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("Credencial '{}' vacía para el canal {}", field, channel);
    }
    Ok(())
}
