//! services/credential_service.rs
//! Resuelve las credenciales de un canal para una empresa: bloque propio de
//! la empresa mezclado sobre los valores globales, con caché en proceso.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    config::channel_config::GlobalChannelConfig,
    models::{channel_model::Channel, credentials_model::ChannelCredentials},
    services::directory_service::DirectoryService,
};

type CacheKey = (String, Channel);

/// Entradas resueltas más una generación por empresa. Invalidar sube la
/// generación; un lookup que arrancó con una generación anterior no escribe.
#[derive(Default)]
struct CredentialCache {
    entries: HashMap<CacheKey, Option<ChannelCredentials>>,
    generations: HashMap<String, u64>,
}

impl CredentialCache {
    fn generation(&self, company_id: &str) -> u64 {
        self.generations.get(company_id).copied().unwrap_or(0)
    }
}

/// Resultado de un lookup sin caché. Las globales usadas por un fallo de
/// lookup o una config inválida no se cachean: el próximo envío reintenta.
#[derive(Debug)]
pub(crate) enum Resolution {
    Cacheable(Option<ChannelCredentials>),
    Fallback(ChannelCredentials),
}

#[derive(Clone)]
pub struct ChannelCredentialService {
    directory: DirectoryService,
    globals: Arc<GlobalChannelConfig>,
    cache: Arc<RwLock<CredentialCache>>,
}

impl ChannelCredentialService {
    pub fn new(directory: DirectoryService, globals: GlobalChannelConfig) -> Self {
        Self {
            directory,
            globals: Arc::new(globals),
            cache: Arc::new(RwLock::new(CredentialCache::default())),
        }
    }

    /// `Ok(None)` cuando la empresa deshabilita explícitamente el canal
    /// (`enabled: false`): el caller debe ir por el camino por defecto.
    /// `Err` solo si no hay forma de armar credenciales válidas.
    pub async fn get_channel_credentials(
        &self,
        company_id: &str,
        channel: Channel,
    ) -> Result<Option<ChannelCredentials>> {
        let key = (company_id.to_string(), channel);
        let generation = {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.entries.get(&key) {
                return Ok(hit.clone());
            }
            cache.generation(company_id)
        };

        match self.resolve_uncached(company_id, channel).await? {
            Resolution::Cacheable(resolved) => {
                self.store_if_current(key, generation, resolved.clone()).await;
                Ok(resolved)
            }
            Resolution::Fallback(globals) => Ok(Some(globals)),
        }
    }

    /// Lectura del directorio + merge con globales, sin tocar la caché.
    /// `Err` solo si tampoco hay globales válidas.
    pub(crate) async fn resolve_uncached(
        &self,
        company_id: &str,
        channel: Channel,
    ) -> Result<Resolution> {
        let company = match self.directory.get_company(company_id).await {
            Ok(company) => company,
            Err(e) => {
                log::warn!(
                    "(resolve_uncached) Falló lookup de company={} ({:#}); usando credenciales globales de {}",
                    company_id,
                    e,
                    channel
                );
                return self.global_credentials(channel).map(Resolution::Fallback);
            }
        };

        let block = company.as_ref().and_then(|c| c.channel_config(channel));
        let resolved = match block {
            None => Some(self.global_credentials(channel)?),
            Some(block) if is_disabled(block) => {
                log::info!(
                    "(resolve_uncached) company={} tiene {} deshabilitado",
                    company_id,
                    channel
                );
                None
            }
            Some(block) => match self.merge_with_globals(channel, block) {
                Ok(creds) => Some(creds),
                Err(e) => {
                    log::warn!(
                        "(resolve_uncached) Config de {} inválida para company={} ({:#}); usando globales",
                        channel,
                        company_id,
                        e
                    );
                    return self.global_credentials(channel).map(Resolution::Fallback);
                }
            },
        };

        Ok(Resolution::Cacheable(resolved))
    }

    /// Generación vigente de la caché para una empresa.
    pub(crate) async fn cache_generation(&self, company_id: &str) -> u64 {
        self.cache.read().await.generation(company_id)
    }

    /// Guarda el valor solo si nadie invalidó la empresa desde que se tomó
    /// `generation`. Devuelve si quedó en caché.
    pub(crate) async fn store_if_current(
        &self,
        key: CacheKey,
        generation: u64,
        value: Option<ChannelCredentials>,
    ) -> bool {
        let mut cache = self.cache.write().await;
        if cache.generation(&key.0) != generation {
            log::debug!(
                "(store_if_current) company={} invalidada durante el lookup de {}; no se cachea",
                key.0,
                key.1
            );
            return false;
        }
        cache.entries.insert(key, value);
        true
    }

    /// Credenciales efectivas para enviar: un canal deshabilitado por la
    /// empresa usa las globales.
    pub async fn credentials_for_send(
        &self,
        company_id: &str,
        channel: Channel,
    ) -> Result<ChannelCredentials> {
        match self.get_channel_credentials(company_id, channel).await? {
            Some(creds) => Ok(creds),
            None => self.global_credentials(channel),
        }
    }

    pub fn global_credentials(&self, channel: Channel) -> Result<ChannelCredentials> {
        ChannelCredentials::from_value(channel, self.globals.defaults_for(channel))
            .with_context(|| format!("Credenciales globales de {} incompletas", channel))
    }

    /// Se llama cada vez que se actualiza una empresa.
    pub async fn invalidate_company(&self, company_id: &str) {
        let mut cache = self.cache.write().await;
        let before = cache.entries.len();
        cache
            .entries
            .retain(|(cached_company, _), _| cached_company != company_id);
        let removed = before - cache.entries.len();
        let generation = cache.generations.entry(company_id.to_string()).or_insert(0);
        *generation += 1;
        log::debug!(
            "(invalidate_company) company={} -> {} entradas eliminadas, generación {}",
            company_id,
            removed,
            generation
        );
    }

    fn merge_with_globals(&self, channel: Channel, block: &Value) -> Result<ChannelCredentials> {
        let mut merged = self.globals.defaults_for(channel);
        if let Value::Object(overrides) = block {
            for (k, v) in overrides {
                if k == "enabled" {
                    continue;
                }
                merge_value(&mut merged, k, v);
            }
        } else {
            log::warn!(
                "(merge_with_globals) Bloque de {} no es un objeto JSON; se ignora",
                channel
            );
        }
        ChannelCredentials::from_value(channel, merged)
    }
}

fn is_disabled(block: &Value) -> bool {
    block.get("enabled").and_then(Value::as_bool) == Some(false)
}

/// Merge profundo de un campo; los null no pisan el valor global.
fn merge_value(target: &mut Value, key: &str, overlay: &Value) {
    if overlay.is_null() {
        return;
    }
    let Value::Object(target_map) = target else {
        return;
    };
    match overlay {
        Value::Object(nested) if target_map.get(key).is_some_and(Value::is_object) => {
            if let Some(existing) = target_map.get_mut(key) {
                for (k, v) in nested {
                    merge_value(existing, k, v);
                }
            }
        }
        _ => {
            target_map.insert(key.to_string(), overlay.clone());
        }
    }
}
