//! app.rs
use crate::handlers::{communication_handler, directory_handler, webhook_handler};
use actix_web::{error, web, HttpResponse};
use serde_json::json;

/// Límite de body JSON (envíos masivos traen listas largas de IDs)
const JSON_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Errores de deserialización con el mismo formato que el resto de la API.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            let response = HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": format!("Body JSON inválido: {}", err)
            }));
            error::InternalError::from_response(err, response).into()
        })
}

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/communications")
                    .route(
                        "/send",
                        web::post().to(communication_handler::send_communication_endpoint),
                    )
                    .route(
                        "/whatsapp",
                        web::post().to(communication_handler::send_whatsapp_endpoint),
                    )
                    .route(
                        "/logs",
                        web::get().to(communication_handler::list_logs_endpoint),
                    ),
            )
            .service(
                web::scope("/companies")
                    .route(
                        "",
                        web::post().to(directory_handler::create_company_endpoint),
                    )
                    .route(
                        "",
                        web::get().to(directory_handler::list_companies_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(directory_handler::get_company_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::put().to(directory_handler::update_company_endpoint),
                    ),
            )
            .service(
                web::scope("/employees")
                    .route(
                        "",
                        web::post().to(directory_handler::create_employee_endpoint),
                    )
                    .route(
                        "",
                        web::get().to(directory_handler::list_employees_endpoint),
                    ),
            )
            .service(
                web::scope("/webhooks")
                    .route("/zoom", web::post().to(webhook_handler::zoom_webhook_endpoint))
                    .route(
                        "/google-meet",
                        web::post().to(webhook_handler::google_meet_webhook_endpoint),
                    )
                    .route(
                        "/microsoft365",
                        web::post().to(webhook_handler::microsoft365_webhook_endpoint),
                    )
                    // resto de métodos -> 405
                    .route(
                        "/zoom",
                        web::route().to(webhook_handler::method_not_allowed_endpoint),
                    )
                    .route(
                        "/google-meet",
                        web::route().to(webhook_handler::method_not_allowed_endpoint),
                    )
                    .route(
                        "/microsoft365",
                        web::route().to(webhook_handler::method_not_allowed_endpoint),
                    ),
            ),
    );
}
