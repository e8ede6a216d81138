use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::{
    errors::ValidationError,
    models::{
        channel_model::Channel,
        directory_model::{
            Company, CreateCompanyRequest, CreateEmployeeRequest, Employee, EmployeeFilter,
            UpdateCompanyRequest,
        },
    },
};

/// SQLite tiene límite de variables por query; partimos los IN (...)
const MAX_IDS_PER_QUERY: usize = 500;

const EMPLOYEE_COLUMNS: &str = "id, name, email, phone, telegram_id, company_id, \
     department, level, work_mode, created_at";

const COMPANY_COLUMNS: &str = "id, name, email_config, sms_config, whatsapp_config, \
     telegram_config, fallback_config, created_at, updated_at";

#[derive(FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    telegram_id: Option<String>,
    company_id: String,
    department: Option<String>,
    level: Option<String>,
    work_mode: Option<String>,
    created_at: String,
}

impl EmployeeRow {
    fn into_employee(self) -> Result<Employee> {
        Ok(Employee {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            telegram_id: self.telegram_id,
            company_id: self.company_id,
            department: self.department,
            level: self.level,
            work_mode: self.work_mode,
        })
    }
}

#[derive(FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    email_config: Option<String>,
    sms_config: Option<String>,
    whatsapp_config: Option<String>,
    telegram_config: Option<String>,
    fallback_config: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CompanyRow {
    fn into_company(self) -> Result<Company> {
        Ok(Company {
            email_config: parse_json_column(self.email_config.as_deref())?,
            sms_config: parse_json_column(self.sms_config.as_deref())?,
            whatsapp_config: parse_json_column(self.whatsapp_config.as_deref())?,
            telegram_config: parse_json_column(self.telegram_config.as_deref())?,
            fallback_config: parse_fallback_config(&self.id, self.fallback_config.as_deref()),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            name: self.name,
        })
    }
}

/// Acceso a empleados y empresas. Desde el router es de solo lectura.
#[derive(Clone, Debug)]
pub struct DirectoryService {
    db_pool: Pool<Sqlite>,
}

impl DirectoryService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        DirectoryService { db_pool }
    }

    pub async fn create_company(&self, req: CreateCompanyRequest) -> Result<Company> {
        if req.name.trim().is_empty() {
            return Err(ValidationError::InvalidField("name".into(), "no puede estar vacío".into()).into());
        }
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            email_config: req.email_config,
            sms_config: req.sms_config,
            whatsapp_config: req.whatsapp_config,
            telegram_config: req.telegram_config,
            fallback_config: req.fallback_config,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, email_config, sms_config, whatsapp_config,
                telegram_config, fallback_config, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(json_column(company.email_config.as_ref()))
        .bind(json_column(company.sms_config.as_ref()))
        .bind(json_column(company.whatsapp_config.as_ref()))
        .bind(json_column(company.telegram_config.as_ref()))
        .bind(fallback_column(company.fallback_config.as_deref())?)
        .bind(now.to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar company")?;

        log::info!("(create_company) Empresa '{}' creada con ID={}", company.name, company.id);
        Ok(company)
    }

    /// Aplica los campos presentes (`null` borra). Devuelve None si la empresa no existe.
    pub async fn update_company(
        &self,
        company_id: &str,
        req: UpdateCompanyRequest,
    ) -> Result<Option<Company>> {
        let Some(mut company) = self.get_company(company_id).await? else {
            return Ok(None);
        };

        if let Some(name) = req.name {
            company.name = name;
        }
        if let Some(email_config) = req.email_config {
            company.email_config = email_config;
        }
        if let Some(sms_config) = req.sms_config {
            company.sms_config = sms_config;
        }
        if let Some(whatsapp_config) = req.whatsapp_config {
            company.whatsapp_config = whatsapp_config;
        }
        if let Some(telegram_config) = req.telegram_config {
            company.telegram_config = telegram_config;
        }
        if let Some(fallback_config) = req.fallback_config {
            company.fallback_config = fallback_config;
        }
        company.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE companies
            SET name = ?2,
                email_config = ?3,
                sms_config = ?4,
                whatsapp_config = ?5,
                telegram_config = ?6,
                fallback_config = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(json_column(company.email_config.as_ref()))
        .bind(json_column(company.sms_config.as_ref()))
        .bind(json_column(company.whatsapp_config.as_ref()))
        .bind(json_column(company.telegram_config.as_ref()))
        .bind(fallback_column(company.fallback_config.as_deref())?)
        .bind(company.updated_at.to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar company")?;

        Ok(Some(company))
    }

    pub async fn get_company(&self, company_id: &str) -> Result<Option<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1");
        let row = sqlx::query_as::<_, CompanyRow>(&sql)
            .bind(company_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error consultando company")?;

        row.map(CompanyRow::into_company).transpose()
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY name");
        let rows = sqlx::query_as::<_, CompanyRow>(&sql)
            .fetch_all(&self.db_pool)
            .await
            .context("Error listando companies")?;

        rows.into_iter().map(CompanyRow::into_company).collect()
    }

    pub async fn create_employee(&self, req: CreateEmployeeRequest) -> Result<Employee> {
        if req.name.trim().is_empty() {
            return Err(ValidationError::InvalidField("name".into(), "no puede estar vacío".into()).into());
        }
        if self.get_company(&req.company_id).await?.is_none() {
            return Err(ValidationError::InvalidField(
                "company_id".into(),
                format!("la empresa '{}' no existe", req.company_id),
            )
            .into());
        }

        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            telegram_id: req.telegram_id,
            company_id: req.company_id,
            department: req.department,
            level: req.level,
            work_mode: req.work_mode,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, name, email, phone, telegram_id, company_id,
                department, level, work_mode, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.telegram_id)
        .bind(&employee.company_id)
        .bind(&employee.department)
        .bind(&employee.level)
        .bind(&employee.work_mode)
        .bind(employee.created_at.to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar employee")?;

        Ok(employee)
    }

    /// Empleados con esos IDs. Los IDs inexistentes simplemente no aparecen.
    pub async fn get_employees_by_ids(&self, ids: &[String]) -> Result<Vec<Employee>> {
        let mut employees = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id IN ("));
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");

            let rows = qb
                .build_query_as::<EmployeeRow>()
                .fetch_all(&self.db_pool)
                .await
                .context("Error consultando employees por id")?;

            for row in rows {
                employees.push(row.into_employee()?);
            }
        }

        Ok(employees)
    }

    pub async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE 1 = 1"));

        if let Some(company_id) = &filter.company_id {
            qb.push(" AND company_id = ").push_bind(company_id.clone());
        }
        if let Some(department) = &filter.department {
            qb.push(" AND department = ").push_bind(department.clone());
        }
        if let Some(level) = &filter.level {
            qb.push(" AND level = ").push_bind(level.clone());
        }
        if let Some(work_mode) = &filter.work_mode {
            qb.push(" AND work_mode = ").push_bind(work_mode.clone());
        }
        qb.push(" ORDER BY name");

        let rows = qb
            .build_query_as::<EmployeeRow>()
            .fetch_all(&self.db_pool)
            .await
            .context("Error listando employees")?;

        rows.into_iter().map(EmployeeRow::into_employee).collect()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse()
        .with_context(|| format!("Timestamp inválido en DB: '{}'", raw))
}

fn json_column(value: Option<&Value>) -> Option<String> {
    value.map(Value::to_string)
}

fn parse_json_column(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(s).context("JSON inválido en columna de config"))
        .transpose()
}

fn fallback_column(order: Option<&[Channel]>) -> Result<Option<String>> {
    order
        .map(|o| serde_json::to_string(o).context("No se pudo serializar fallback_config"))
        .transpose()
}

/// Canales desconocidos se descartan con un warning en vez de romper la lectura.
fn parse_fallback_config(company_id: &str, raw: Option<&str>) -> Option<Vec<Channel>> {
    let raw = raw?;
    let names: Vec<String> = match serde_json::from_str(raw) {
        Ok(names) => names,
        Err(e) => {
            log::warn!(
                "(parse_fallback_config) fallback_config ilegible para company={}: {}",
                company_id,
                e
            );
            return None;
        }
    };

    let order = names
        .iter()
        .filter_map(|name| match name.parse::<Channel>() {
            Ok(ch) => Some(ch),
            Err(_) => {
                log::warn!(
                    "(parse_fallback_config) Canal '{}' ignorado en fallback_config de company={}",
                    name,
                    company_id
                );
                None
            }
        })
        .collect();
    Some(order)
}
