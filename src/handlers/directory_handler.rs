//! handlers/directory_handler.rs
//! CRUD mínimo de empresas y empleados.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    handlers::error_response,
    models::directory_model::{
        CreateCompanyRequest, CreateEmployeeRequest, EmployeeFilter, UpdateCompanyRequest,
    },
    services::{credential_service::ChannelCredentialService, directory_service::DirectoryService},
};

/// POST /api/companies
pub async fn create_company_endpoint(
    directory: web::Data<DirectoryService>,
    body: web::Json<CreateCompanyRequest>,
) -> HttpResponse {
    match directory.create_company(body.into_inner()).await {
        Ok(company) => HttpResponse::Created().json(company),
        Err(e) => error_response(e),
    }
}

/// GET /api/companies
pub async fn list_companies_endpoint(directory: web::Data<DirectoryService>) -> HttpResponse {
    match directory.list_companies().await {
        Ok(companies) => HttpResponse::Ok().json(companies),
        Err(e) => error_response(e),
    }
}

/// GET /api/companies/{id}
pub async fn get_company_endpoint(
    directory: web::Data<DirectoryService>,
    path: web::Path<String>,
) -> HttpResponse {
    let company_id = path.into_inner();

    match directory.get_company(&company_id).await {
        Ok(Some(company)) => HttpResponse::Ok().json(company),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Empresa no encontrada"
        })),
        Err(e) => error_response(e),
    }
}

/// PUT /api/companies/{id}
/// Invalida la caché de credenciales de la empresa.
pub async fn update_company_endpoint(
    directory: web::Data<DirectoryService>,
    credentials: web::Data<ChannelCredentialService>,
    path: web::Path<String>,
    body: web::Json<UpdateCompanyRequest>,
) -> HttpResponse {
    let company_id = path.into_inner();

    match directory.update_company(&company_id, body.into_inner()).await {
        Ok(Some(company)) => {
            credentials.invalidate_company(&company_id).await;
            HttpResponse::Ok().json(company)
        }
        Ok(None) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Empresa no encontrada"
        })),
        Err(e) => error_response(e),
    }
}

/// POST /api/employees
pub async fn create_employee_endpoint(
    directory: web::Data<DirectoryService>,
    body: web::Json<CreateEmployeeRequest>,
) -> HttpResponse {
    match directory.create_employee(body.into_inner()).await {
        Ok(employee) => HttpResponse::Created().json(employee),
        Err(e) => error_response(e),
    }
}

/// GET /api/employees?company_id=&department=&level=&work_mode=
pub async fn list_employees_endpoint(
    directory: web::Data<DirectoryService>,
    query: web::Query<EmployeeFilter>,
) -> HttpResponse {
    match directory.list_employees(&query).await {
        Ok(employees) => HttpResponse::Ok().json(employees),
        Err(e) => error_response(e),
    }
}
