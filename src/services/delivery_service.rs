//! services/delivery_service.rs
//! Orquestador de envíos con fallback: agrupa destinatarios por empresa y
//! canal, despacha cada bucket y agrega los resultados.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use futures::{stream, StreamExt};

use crate::{
    errors::ValidationError,
    models::{
        channel_model::Channel,
        communication_model::{AggregateResult, ChannelSummary, OutboundMessage, SendOptions, SendOutcome},
        directory_model::Employee,
    },
    services::{
        channel_sender_service::ChannelSenderService,
        directory_service::DirectoryService,
        grouping_service::{group_employees_by_company_and_channel, RecipientGrouping},
    },
};

#[derive(Clone)]
pub struct DeliveryService {
    directory: DirectoryService,
    sender: ChannelSenderService,
    max_concurrent_buckets: usize,
}

impl DeliveryService {
    pub fn new(sender: ChannelSenderService, max_concurrent_buckets: usize) -> Self {
        Self {
            directory: sender.directory().clone(),
            sender,
            max_concurrent_buckets: max_concurrent_buckets.max(1),
        }
    }

    /// Envía por `primary_channel` y, para quien no lo tenga, por el primer
    /// canal disponible del orden de fallback. Solo falla por validación.
    pub async fn send_with_fallback(
        &self,
        recipient_ids: &[String],
        message: &OutboundMessage,
        primary_channel: Channel,
        fallback_order: Option<&[Channel]>,
        options: &SendOptions,
    ) -> Result<AggregateResult> {
        let ids = validate_send_request(recipient_ids, message)?;
        let total = ids.len();

        log::info!(
            "(send_with_fallback) Iniciando envío: destinatarios={}, canal primario={}, fallback={:?}",
            total,
            primary_channel,
            fallback_order
        );

        // 1) Empleados
        let employees = match self.directory.get_employees_by_ids(&ids).await {
            Ok(list) => list,
            Err(e) => {
                log::error!("(send_with_fallback) No se pudieron cargar empleados: {:#}", e);
                return Ok(aggregate(total, Vec::new(), Vec::new(), Some(format!("{:#}", e))));
            }
        };

        let found: HashSet<&str> = employees.iter().map(|e| e.id.as_str()).collect();
        let mut unreachable: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        if !unreachable.is_empty() {
            log::warn!(
                "(send_with_fallback) {} destinatarios no existen: {:?}",
                unreachable.len(),
                unreachable
            );
        }

        // 2) Orden de fallback de cada empresa
        let company_orders = self.load_company_orders(&employees).await;

        // 3) Agrupar
        let grouping = group_employees_by_company_and_channel(
            &employees,
            primary_channel,
            fallback_order,
            &company_orders,
        );
        log::debug!(
            "(send_with_fallback) {} asignados, {} sin canal",
            grouping.assigned_count(),
            grouping.unreachable.len()
        );
        let RecipientGrouping {
            buckets,
            unreachable: dropped,
        } = grouping;
        unreachable.extend(dropped);

        // 4) Despachar buckets
        let by_id: HashMap<&str, &Employee> =
            employees.iter().map(|e| (e.id.as_str(), e)).collect();
        let jobs: Vec<(String, Channel, Vec<Employee>)> = buckets
            .into_iter()
            .flat_map(|(company_id, by_channel)| {
                by_channel
                    .into_iter()
                    .map(move |(channel, member_ids)| (company_id.clone(), channel, member_ids))
            })
            .filter(|(_, _, member_ids)| !member_ids.is_empty())
            .map(|(company_id, channel, member_ids)| {
                let members = member_ids
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).map(|e| (*e).clone()))
                    .collect();
                (company_id, channel, members)
            })
            .collect();

        log::info!(
            "(send_with_fallback) {} buckets a despachar (concurrencia={})",
            jobs.len(),
            self.max_concurrent_buckets
        );

        let mut details: Vec<SendOutcome> = stream::iter(jobs)
            .map(|(company_id, channel, members)| async move {
                self.sender
                    .send_to_employees(channel, &company_id, &members, message, options)
                    .await
            })
            .buffer_unordered(self.max_concurrent_buckets)
            .collect()
            .await;
        details.sort_by(|a, b| (&a.company_id, a.channel).cmp(&(&b.company_id, b.channel)));

        let result = aggregate(total, details, unreachable, None);
        log::info!(
            "(send_with_fallback) Finalizado: exitosos={}, fallidos={}, tasa={:.1}%",
            result.successful,
            result.failed,
            result.success_rate
        );
        Ok(result)
    }

    /// Envío directo por un solo canal, sin fallback.
    pub async fn send_on_channel(
        &self,
        recipient_ids: &[String],
        message: &OutboundMessage,
        channel: Channel,
        options: &SendOptions,
    ) -> Result<AggregateResult> {
        self.send_with_fallback(recipient_ids, message, channel, Some(&[]), options)
            .await
    }

    /// Usado por los webhooks de reuniones.
    pub async fn send_whatsapp_message(
        &self,
        recipient_ids: &[String],
        message: &str,
        options: &SendOptions,
    ) -> Result<AggregateResult> {
        self.send_on_channel(
            recipient_ids,
            &OutboundMessage::text(message),
            Channel::Whatsapp,
            options,
        )
        .await
    }

    async fn load_company_orders(&self, employees: &[Employee]) -> HashMap<String, Vec<Channel>> {
        let company_ids: HashSet<&str> = employees.iter().map(|e| e.company_id.as_str()).collect();
        let mut orders = HashMap::new();

        for company_id in company_ids {
            match self.directory.get_company(company_id).await {
                Ok(Some(company)) => {
                    if let Some(order) = company.fallback_config {
                        orders.insert(company_id.to_string(), order);
                    }
                }
                Ok(None) => log::warn!(
                    "(load_company_orders) company={} no existe; orden por defecto",
                    company_id
                ),
                Err(e) => log::warn!(
                    "(load_company_orders) Falló lookup de company={} ({:#}); orden por defecto",
                    company_id,
                    e
                ),
            }
        }
        orders
    }
}

/// Rechaza requests vacíos y devuelve los IDs sin duplicados (en orden).
pub fn validate_send_request(
    recipient_ids: &[String],
    message: &OutboundMessage,
) -> Result<Vec<String>, ValidationError> {
    if message.body.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }

    let mut seen = HashSet::new();
    let ids: Vec<String> = recipient_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ValidationError::EmptyRecipients);
    }
    Ok(ids)
}

pub fn aggregate(
    total: usize,
    details: Vec<SendOutcome>,
    unreachable: Vec<String>,
    error: Option<String>,
) -> AggregateResult {
    let mut by_channel: BTreeMap<Channel, ChannelSummary> = BTreeMap::new();
    let mut successful = 0;
    let mut failed = 0;

    for outcome in &details {
        successful += outcome.delivered;
        failed += outcome.failed;
        let summary = by_channel.entry(outcome.channel).or_default();
        summary.sent += outcome.delivered;
        summary.failed += outcome.failed;
    }

    // Lo que no llegó a ningún bucket también es un fallo
    let accounted = successful + failed + unreachable.len();
    failed += unreachable.len() + total.saturating_sub(accounted);

    let success_rate = if total > 0 {
        successful as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    AggregateResult {
        success: successful > 0,
        total,
        successful,
        failed,
        unreachable,
        success_rate,
        by_channel,
        details,
        error,
    }
}
