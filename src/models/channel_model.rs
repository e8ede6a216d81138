//! models/channel_model.rs
//! Canales de mensajería soportados y orden de fallback por defecto.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Whatsapp,
    Telegram,
    Sms,
    Email,
}

/// Orden usado cuando ni el caller ni la empresa definen uno.
pub const DEFAULT_FALLBACK_ORDER: [Channel; 4] = [
    Channel::Whatsapp,
    Channel::Telegram,
    Channel::Sms,
    Channel::Email,
];

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Whatsapp => "whatsapp",
            Channel::Telegram => "telegram",
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Channel::Whatsapp),
            "telegram" => Ok(Channel::Telegram),
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            other => Err(anyhow!("Canal desconocido: {}", other)),
        }
    }
}
