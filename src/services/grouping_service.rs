//! services/grouping_service.rs
//! Reparte empleados por empresa y luego por el mejor canal disponible.

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    channel_model::{Channel, DEFAULT_FALLBACK_ORDER},
    directory_model::Employee,
};

/// company_id -> canal -> IDs de empleados (en el orden de entrada)
pub type CompanyBuckets = BTreeMap<String, BTreeMap<Channel, Vec<String>>>;

#[derive(Debug, Clone, Default)]
pub struct RecipientGrouping {
    pub buckets: CompanyBuckets,
    /// Empleados sin ningún canal del orden aplicable
    pub unreachable: Vec<String>,
}

impl RecipientGrouping {
    pub fn assigned_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|by_channel| by_channel.values())
            .map(Vec::len)
            .sum()
    }
}

/// Canales para los que el empleado tiene dato de contacto.
pub fn available_channels(employee: &Employee) -> Vec<Channel> {
    DEFAULT_FALLBACK_ORDER
        .iter()
        .copied()
        .filter(|ch| employee.contact_for(*ch).is_some())
        .collect()
}

/// Orden efectivo para una empresa: el explícito del caller, luego el de la
/// empresa y por último el default.
pub fn resolve_fallback_order<'a>(
    company_id: &str,
    fallback_order: Option<&'a [Channel]>,
    company_orders: &'a HashMap<String, Vec<Channel>>,
) -> &'a [Channel] {
    fallback_order
        .or_else(|| company_orders.get(company_id).map(Vec::as_slice))
        .unwrap_or(&DEFAULT_FALLBACK_ORDER)
}

/// Canal asignado a un empleado, o None si no tiene ninguno utilizable.
pub fn select_channel(employee: &Employee, primary: Channel, order: &[Channel]) -> Option<Channel> {
    if employee.contact_for(primary).is_some() {
        return Some(primary);
    }
    order
        .iter()
        .copied()
        .find(|ch| employee.contact_for(*ch).is_some())
}

pub fn group_employees_by_company_and_channel(
    employees: &[Employee],
    primary_channel: Channel,
    fallback_order: Option<&[Channel]>,
    company_orders: &HashMap<String, Vec<Channel>>,
) -> RecipientGrouping {
    let mut grouping = RecipientGrouping::default();

    for employee in employees {
        let order = resolve_fallback_order(&employee.company_id, fallback_order, company_orders);

        match select_channel(employee, primary_channel, order) {
            Some(channel) => grouping
                .buckets
                .entry(employee.company_id.clone())
                .or_default()
                .entry(channel)
                .or_default()
                .push(employee.id.clone()),
            None => {
                log::warn!(
                    "(group_employees_by_company_and_channel) Empleado {} (company={}) sin canal utilizable",
                    employee.id,
                    employee.company_id
                );
                grouping.unreachable.push(employee.id.clone());
            }
        }
    }

    grouping
}
