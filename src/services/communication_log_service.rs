use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::models::{
    channel_model::Channel,
    communication_model::{
        CommunicationLogRecord, ListLogsResponse, LogQuery, LogStatus, NewCommunicationLog,
    },
};

const MAX_PAGE_SIZE: u64 = 200;

#[derive(FromRow)]
struct LogRow {
    id: String,
    company_id: String,
    sender_id: String,
    recipient_ids: String,
    message: String,
    channel_id: String,
    status: String,
    error_message: Option<String>,
    sent_at: String,
    updated_at: String,
}

impl LogRow {
    fn into_record(self) -> Result<CommunicationLogRecord> {
        Ok(CommunicationLogRecord {
            recipient_ids: serde_json::from_str(&self.recipient_ids)
                .context("recipient_ids inválido en communication_logs")?,
            channel: self.channel_id.parse::<Channel>()?,
            sent_at: self.sent_at.parse()?,
            updated_at: self.updated_at.parse()?,
            id: self.id,
            company_id: self.company_id,
            sender_id: self.sender_id,
            message: self.message,
            status: self.status,
            error_message: self.error_message,
        })
    }
}

/// Registro append-only de envíos (una fila por lote).
#[derive(Clone, Debug)]
pub struct CommunicationLogService {
    db_pool: Pool<Sqlite>,
}

impl CommunicationLogService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CommunicationLogService { db_pool }
    }

    /// Crea el log en estado "pending" y devuelve su ID.
    pub async fn create_log(&self, entry: NewCommunicationLog<'_>) -> Result<String> {
        let log_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let recipients = serde_json::to_string(entry.recipient_ids)?;

        sqlx::query(
            r#"
            INSERT INTO communication_logs (
                id, company_id, sender_id, recipient_ids, message,
                channel_id, status, error_message, sent_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)
            "#,
        )
        .bind(&log_id)
        .bind(entry.company_id)
        .bind(entry.sender_id)
        .bind(recipients)
        .bind(entry.message)
        .bind(entry.channel.as_str())
        .bind(LogStatus::Pending.as_str())
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Error creando communication_log")?;

        Ok(log_id)
    }

    /// Único cambio permitido sobre un log: su estado.
    pub async fn update_log_status(
        &self,
        log_id: &str,
        status: LogStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE communication_logs
            SET status = ?1,
                error_message = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(now)
        .bind(log_id)
        .execute(&self.db_pool)
        .await
        .context("Error actualizando communication_log")?;

        Ok(())
    }

    pub async fn get_log(&self, log_id: &str) -> Result<CommunicationLogRecord> {
        let row = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, company_id, sender_id, recipient_ids, message,
                   channel_id, status, error_message, sent_at, updated_at
            FROM communication_logs
            WHERE id = ?1
            "#,
        )
        .bind(log_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró communication_log")?;

        row.into_record()
    }

    /// Lista logs con paginación, más recientes primero.
    pub async fn list_logs(&self, query: &LogQuery) -> Result<ListLogsResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
        // None si el offset desborda u64 o no cabe en i64
        let offset = (page - 1)
            .checked_mul(page_size)
            .and_then(|o| i64::try_from(o).ok());

        // total
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM communication_logs WHERE 1 = 1");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await
            .context("Error contando communication_logs")?;

        let Some(offset) = offset else {
            log::debug!(
                "(list_logs) page={} page_size={} fuera de rango; página vacía",
                page,
                page_size
            );
            return Ok(ListLogsResponse {
                total: total as u64,
                page,
                page_size,
                items: Vec::new(),
            });
        };

        // items
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, company_id, sender_id, recipient_ids, message, \
             channel_id, status, error_message, sent_at, updated_at \
             FROM communication_logs WHERE 1 = 1",
        );
        push_filters(&mut qb, query);
        qb.push(" ORDER BY sent_at DESC, id DESC LIMIT ")
            .push_bind(page_size as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build_query_as::<LogRow>()
            .fetch_all(&self.db_pool)
            .await
            .context("Error listando communication_logs")?;

        let items = rows
            .into_iter()
            .map(LogRow::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListLogsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &LogQuery) {
    if let Some(company_id) = &query.company_id {
        qb.push(" AND company_id = ").push_bind(company_id.clone());
    }
    if let Some(channel) = query.channel {
        qb.push(" AND channel_id = ").push_bind(channel.as_str());
    }
}
