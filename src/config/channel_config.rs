//! config/channel_config.rs
//! Credenciales globales por canal. Se guardan como objetos JSON para poder
//! mezclarlas con los bloques de cada empresa; la validación tipada ocurre
//! al construir `ChannelCredentials`.

use std::env;

use serde_json::{Map, Value};

use crate::models::channel_model::Channel;

#[derive(Debug, Clone, Default)]
pub struct GlobalChannelConfig {
    pub whatsapp: Map<String, Value>,
    pub telegram: Map<String, Value>,
    pub sms: Map<String, Value>,
    pub email: Map<String, Value>,
}

impl GlobalChannelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la config a partir de una función de lookup (env, tests...).
    /// Las variables vacías se ignoran.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut whatsapp = Map::new();
        put(&mut whatsapp, "access_token", get("WHATSAPP_ACCESS_TOKEN"));
        put(&mut whatsapp, "phone_number_id", get("WHATSAPP_PHONE_NUMBER_ID"));
        put(&mut whatsapp, "api_url", get("WHATSAPP_API_URL"));

        let mut telegram = Map::new();
        put(&mut telegram, "bot_token", get("TELEGRAM_BOT_TOKEN"));
        put(&mut telegram, "api_url", get("TELEGRAM_API_URL"));

        let mut sms = Map::new();
        put(&mut sms, "api_key", get("BREVO_API_KEY"));
        put(&mut sms, "sender", get("BREVO_SMS_SENDER"));
        put(&mut sms, "api_url", get("BREVO_API_URL"));

        let provider = get("EMAIL_PROVIDER")
            .map(|p| p.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "brevo".to_string());
        let mut email = Map::new();
        email.insert("provider".to_string(), Value::String(provider.clone()));
        if provider == "smtp" {
            put(&mut email, "host", get("SMTP_HOST"));
            put(&mut email, "user", get("SMTP_USER"));
            put(&mut email, "password", get("SMTP_PASS"));
            put(&mut email, "from", get("SMTP_FROM"));
            if let Some(raw) = get("SMTP_PORT") {
                match raw.trim().parse::<u16>() {
                    Ok(port) => {
                        email.insert("port".to_string(), Value::from(port));
                    }
                    Err(_) => log::warn!("(GlobalChannelConfig) SMTP_PORT inválido: '{}'", raw),
                }
            }
        } else {
            put(&mut email, "api_key", get("BREVO_API_KEY"));
            put(&mut email, "sender_email", get("BREVO_SENDER_EMAIL"));
            put(&mut email, "sender_name", get("BREVO_SENDER_NAME"));
            put(&mut email, "api_url", get("BREVO_API_URL"));
        }

        GlobalChannelConfig {
            whatsapp,
            telegram,
            sms,
            email,
        }
    }

    pub fn defaults_for(&self, channel: Channel) -> Value {
        let map = match channel {
            Channel::Whatsapp => &self.whatsapp,
            Channel::Telegram => &self.telegram,
            Channel::Sms => &self.sms,
            Channel::Email => &self.email,
        };
        Value::Object(map.clone())
    }
}

fn put(map: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::String(v));
    }
}
