//! tests/handler_tests.rs
//! Pruebas de los endpoints HTTP montados con `app::init_app`.

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, web, App};
    use serde_json::{json, Value};

    use crate::app::init_app;
    use crate::models::channel_model::Channel;
    use crate::services::webhook_service::{zoom_encrypted_token, WebhookService};
    use crate::tests::{MockBehavior, MockTransport, TestContext};

    const ZOOM_SECRET: &str = "zoom-secret";

    macro_rules! test_app {
        ($ctx:expr, $transports:expr) => {{
            let delivery = $ctx.router($transports, 1);
            let webhooks = WebhookService::new(delivery.clone(), Some(ZOOM_SECRET.to_string()));
            test::init_service(
                App::new()
                    .app_data(web::Data::new($ctx.directory.clone()))
                    .app_data(web::Data::new($ctx.logs.clone()))
                    .app_data(web::Data::new($ctx.credentials.clone()))
                    .app_data(web::Data::new(delivery))
                    .app_data(web::Data::new(webhooks))
                    .configure(init_app),
            )
            .await
        }};
    }

    #[actix_rt::test]
    async fn test_webhook_rejects_other_methods() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        for uri in ["/api/webhooks/zoom", "/api/webhooks/google-meet", "/api/webhooks/microsoft365"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
            assert_eq!(
                resp.headers().get(header::ALLOW).and_then(|v| v.to_str().ok()),
                Some("POST")
            );
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], json!(false));
        }
    }

    #[actix_rt::test]
    async fn test_client_error_messages_are_spanish() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::get().uri("/api/webhooks/zoom").to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"], json!("Método no permitido"));

        let req = test::TestRequest::get().uri("/api/companies/nope").to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"], json!("Empresa no encontrada"));

        let req = test::TestRequest::put()
            .uri("/api/companies/nope")
            .set_json(json!({ "name": "X" }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"], json!("Empresa no encontrada"));

        let req = test::TestRequest::post()
            .uri("/api/communications/send")
            .set_json(json!({ "recipient_ids": [], "message": "hola", "primary_channel": "email" }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"], json!("recipient_ids debe contener al menos un id"));

        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(json!({ "name": "Ana", "company_id": "nope" }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(
            body["error"],
            json!("Campo 'company_id' inválido: la empresa 'nope' no existe")
        );

        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert!(body["error"]
            .as_str()
            .unwrap_or_default()
            .starts_with("Body JSON inválido"));
    }

    #[actix_rt::test]
    async fn test_webhook_invalid_json_is_bad_request() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_webhook_missing_event_type_is_bad_request() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/google-meet?user_id=u1")
            .set_json(json!({ "meeting": { "title": "x" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap_or_default().contains("event"));
    }

    #[actix_rt::test]
    async fn test_zoom_url_validation_handshake() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .set_json(json!({
                "event": "endpoint.url_validation",
                "payload": { "plainToken": "qgg8vlvZRS6UYooatFL8Aw" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let expected = zoom_encrypted_token(ZOOM_SECRET, "qgg8vlvZRS6UYooatFL8Aw").expect("hmac");
        assert_eq!(body["plainToken"], json!("qgg8vlvZRS6UYooatFL8Aw"));
        assert_eq!(body["encryptedToken"], json!(expected));
    }

    #[actix_rt::test]
    async fn test_microsoft_validation_token_is_echoed() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/microsoft365?validationToken=abc%20123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"abc 123");
    }

    #[actix_rt::test]
    async fn test_webhook_notification_delivery_status() {
        let ctx = TestContext::new().await;
        let wa = MockTransport::new(Channel::Whatsapp, MockBehavior::Deliver);
        let app = test_app!(ctx, &[wa.clone()]);

        let company = ctx.company("Acme", None).await;
        let with_phone = ctx.employee(&company.id, "A", None, Some("+15550100"), None).await;
        let without_phone = ctx.employee(&company.id, "B", Some("b@acme.test"), None, None).await;

        let started = |user: &str| {
            json!({
                "event": "meeting.started",
                "user_id": user,
                "payload": { "object": { "topic": "Daily", "join_url": "https://zoom.us/j/1" } }
            })
        };

        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .set_json(started(&with_phone.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(wa.recorded()[0].body.contains("Daily"));

        // Sin teléfono no hay WhatsApp posible
        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .set_json(started(&without_phone.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Evento sin notificación asociada
        let req = test::TestRequest::post()
            .uri("/api/webhooks/zoom")
            .set_json(json!({ "event": "meeting.sharing_started", "user_id": with_phone.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(wa.recorded().len(), 1);
    }

    #[actix_rt::test]
    async fn test_send_endpoint_validation_and_success() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &MockTransport::all(MockBehavior::Deliver));

        let company = ctx.company("Acme", None).await;
        let a = ctx.employee(&company.id, "A", Some("a@acme.test"), None, None).await;

        // Lista vacía -> 400
        let req = test::TestRequest::post()
            .uri("/api/communications/send")
            .set_json(json!({ "recipient_ids": [], "message": "hola", "primary_channel": "email" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Canal desconocido -> 400 con el mismo formato
        let req = test::TestRequest::post()
            .uri("/api/communications/send")
            .set_json(json!({ "recipient_ids": [&a.id], "message": "hola", "primary_channel": "fax" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));

        let req = test::TestRequest::post()
            .uri("/api/communications/send")
            .set_json(json!({
                "recipient_ids": [&a.id],
                "message": "hola",
                "subject": "Aviso",
                "primary_channel": "email",
                "fallback_order": ["sms", "whatsapp"],
                "sender_id": "rrhh"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["successful"], json!(1));
        assert_eq!(body["by_channel"]["email"]["sent"], json!(1));

        // El log queda consultable
        let req = test::TestRequest::get()
            .uri(&format!("/api/communications/logs?company_id={}&channel=email", company.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["items"][0]["sender_id"], json!("rrhh"));
    }

    #[actix_rt::test]
    async fn test_company_and_employee_endpoints() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx, &[]);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .set_json(json!({ "name": "Acme", "fallback_config": ["email", "sms"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let company: Value = test::read_body_json(resp).await;
        let company_id = company["id"].as_str().expect("id").to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/api/companies/{}", company_id))
            .set_json(json!({ "telegram_config": { "bot_token": "tg-acme" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Value = test::read_body_json(resp).await;
        assert_eq!(updated["fallback_config"], json!(["email", "sms"]));
        assert_eq!(updated["telegram_config"]["bot_token"], json!("tg-acme"));

        // null explícito borra; lo ausente se conserva
        let req = test::TestRequest::put()
            .uri(&format!("/api/companies/{}", company_id))
            .set_json(json!({ "fallback_config": null }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cleared: Value = test::read_body_json(resp).await;
        assert_eq!(cleared["fallback_config"], Value::Null);
        assert_eq!(cleared["telegram_config"]["bot_token"], json!("tg-acme"));

        let req = test::TestRequest::get().uri("/api/companies/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(json!({ "name": "Ana", "company_id": company_id, "department": "IT" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(json!({ "name": "Ana", "company_id": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/api/employees?company_id={}&department=IT", company_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let employees: Value = test::read_body_json(resp).await;
        assert_eq!(employees.as_array().map(Vec::len), Some(1));
    }
}
