//! tests/transport_tests.rs
//! Pruebas de los transportes HTTP contra un servidor simulado (wiremock).

#[cfg(test)]
mod tests {
    use actix_rt::test;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::channel_model::Channel;
    use crate::models::communication_model::{OutboundMessage, Recipient, SendOptions};
    use crate::models::credentials_model::{
        ChannelCredentials, EmailCredentials, SmsCredentials, TelegramCredentials,
        WhatsAppCredentials,
    };
    use crate::services::channel_sender_service::ChannelTransport;
    use crate::services::delivery_service::DeliveryService;
    use crate::services::email_service::EmailService;
    use crate::services::sms_service::SmsService;
    use crate::services::telegram_service::TelegramService;
    use crate::services::whatsapp_service::{normalize_phone, WhatsAppService};
    use crate::tests::{test_globals_with, TestContext};

    fn recipient(id: &str, address: &str) -> Recipient {
        Recipient {
            employee_id: id.to_string(),
            name: format!("Empleado {}", id),
            address: address.to_string(),
        }
    }

    fn whatsapp_creds(api_url: &str) -> ChannelCredentials {
        ChannelCredentials::Whatsapp(WhatsAppCredentials {
            access_token: "wa-token".into(),
            phone_number_id: "1000".into(),
            api_url: api_url.into(),
        })
    }

    #[test]
    async fn test_whatsapp_posts_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1000/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_partial_json(json!({
                "messaging_product": "whatsapp",
                "to": "15550100",
                "text": { "body": "hola" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{ "id": "wamid.1" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = WhatsAppService::new(Client::new());
        let report = service
            .deliver(
                &whatsapp_creds(&server.uri()),
                &[recipient("e1", "+1 555-0100")],
                &OutboundMessage::text("hola"),
            )
            .await
            .expect("deliver");

        assert_eq!(report.delivered, vec!["e1".to_string()]);
        assert!(report.failures.is_empty());
    }

    #[test]
    async fn test_whatsapp_error_status_is_a_recipient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1000/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid OAuth access token" }
            })))
            .mount(&server)
            .await;

        let service = WhatsAppService::new(Client::new());
        let report = service
            .deliver(
                &whatsapp_creds(&server.uri()),
                &[recipient("e1", "+15550100"), recipient("e2", "12")],
                &OutboundMessage::text("hola"),
            )
            .await
            .expect("deliver");

        assert!(report.delivered.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].error.contains("401"));
        // número demasiado corto: no llega a hacer la llamada
        assert!(report.failures[1].error.contains("Teléfono inválido"));
    }

    #[test]
    async fn test_transport_rejects_foreign_credentials() {
        let service = WhatsAppService::new(Client::new());
        let creds = ChannelCredentials::Telegram(TelegramCredentials {
            bot_token: "x".into(),
            api_url: "http://localhost".into(),
        });
        let result = service
            .deliver(&creds, &[recipient("e1", "+15550100")], &OutboundMessage::text("hola"))
            .await;
        assert!(result.is_err());
    }

    #[test]
    async fn test_telegram_ok_false_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottg-token/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "42" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 1 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottg-token/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "43" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let creds = ChannelCredentials::Telegram(TelegramCredentials {
            bot_token: "tg-token".into(),
            api_url: server.uri(),
        });
        let service = TelegramService::new(Client::new());
        let report = service
            .deliver(
                &creds,
                &[recipient("e1", "42"), recipient("e2", "43")],
                &OutboundMessage::text("hola"),
            )
            .await
            .expect("deliver");

        assert_eq!(report.delivered, vec!["e1".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("chat not found"));
    }

    #[test]
    async fn test_sms_uses_brevo_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/transactionalSMS/sms"))
            .and(header("api-key", "brevo-key"))
            .and(body_partial_json(json!({
                "sender": "Acme",
                "recipient": "34600000001",
                "content": "hola"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "messageId": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let creds = ChannelCredentials::Sms(SmsCredentials {
            api_key: "brevo-key".into(),
            sender: "Acme".into(),
            api_url: server.uri(),
        });
        let report = SmsService::new(Client::new())
            .deliver(
                &creds,
                &[recipient("e1", "0034 600 000 001")],
                &OutboundMessage::text("hola"),
            )
            .await
            .expect("deliver");
        assert_eq!(report.delivered.len(), 1);
    }

    #[test]
    async fn test_email_via_brevo_sends_subject() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/smtp/email"))
            .and(header("api-key", "brevo-key"))
            .and(body_partial_json(json!({
                "sender": { "email": "noreply@acme.test" },
                "to": [{ "email": "ana@acme.test" }],
                "subject": "Aviso",
                "textContent": "hola"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "messageId": "<1@brevo>" })))
            .expect(1)
            .mount(&server)
            .await;

        let creds = ChannelCredentials::Email(EmailCredentials::Brevo {
            api_key: "brevo-key".into(),
            sender_email: "noreply@acme.test".into(),
            sender_name: None,
            api_url: server.uri(),
        });
        let message = OutboundMessage {
            subject: Some("Aviso".into()),
            body: "hola".into(),
        };
        let report = EmailService::new(Client::new())
            .deliver(&creds, &[recipient("e1", "ana@acme.test")], &message)
            .await
            .expect("deliver");
        assert_eq!(report.delivered, vec!["e1".to_string()]);
    }

    #[test]
    async fn test_smtp_with_invalid_recipient_is_a_failure() {
        let creds = ChannelCredentials::Email(EmailCredentials::Smtp {
            host: "localhost".into(),
            port: 2525,
            user: "mailer@acme.test".into(),
            password: "secret".into(),
            from: None,
        });
        let report = EmailService::new(Client::new())
            .deliver(&creds, &[recipient("e1", "no-es-un-email")], &OutboundMessage::text("hola"))
            .await
            .expect("deliver");
        assert!(report.delivered.is_empty());
        assert!(report.failures[0].error.contains("Dirección de destinatario inválida"));
    }

    #[test]
    async fn test_router_with_real_transports_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1000/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": [] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/smtp/email"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "messageId": "x" })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let ctx = TestContext::with_globals(test_globals_with(|key| match key {
            "WHATSAPP_API_URL" | "BREVO_API_URL" => Some(uri.clone()),
            _ => None,
        }))
        .await;
        let router = DeliveryService::new(ctx.sender().with_default_transports(Client::new()), 1);

        let company = ctx.company("Acme", None).await;
        let a = ctx.employee(&company.id, "Ana", Some("ana@acme.test"), None, None).await;
        let b = ctx.employee(&company.id, "Beto", None, Some("+15550100"), None).await;

        let result = router
            .send_with_fallback(
                &[a.id, b.id],
                &OutboundMessage::text("hola"),
                Channel::Email,
                None,
                &SendOptions::default(),
            )
            .await
            .expect("send");

        assert_eq!(result.successful, 2);
        assert_eq!(result.success_rate, 100.0);
    }

    #[test]
    async fn test_normalize_phone() {
        assert_eq!(normalize_phone("+34 600-000-001").as_deref(), Some("34600000001"));
        assert_eq!(normalize_phone("0034600000001").as_deref(), Some("34600000001"));
        assert_eq!(normalize_phone("(555) 0100").as_deref(), Some("5550100"));
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("abc"), None);
    }
}
