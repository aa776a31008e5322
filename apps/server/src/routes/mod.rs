use actix_web::web::{self, ServiceConfig};

use crate::error::AppError;

mod events;
mod health;
mod integrations;
mod monitors;

/// Register every route plus the JSON body settings
pub fn routes(cfg: &mut ServiceConfig) {
    cfg.app_data(json_config());

    health::routes(cfg);
    monitors::routes(cfg);
    integrations::routes(cfg);
    events::routes(cfg);
}

/// Malformed bodies answer with the same `{"message": ...}` shape as other errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use vigil_service::database::models::NewAttempt;
    use vigil_service::database::{Database, DatabaseImpl, initialize_database};
    use vigil_service::pool::open_pool;

    async fn database() -> (Arc<dyn Database>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.db");
        let pool = open_pool(&path.to_string_lossy(), 4).await.unwrap();
        {
            let conn = pool.get().await.unwrap();
            initialize_database(&conn).await.unwrap();
        }
        (Arc::new(DatabaseImpl::new_from_pool(pool)), dir)
    }

    macro_rules! app {
        ($database:expr) => {
            test::init_service(
                App::new().app_data(web::Data::from($database.clone())).configure(super::routes),
            )
            .await
        };
    }

    async fn create_integration(database: &Arc<dyn Database>) -> i64 {
        let app = app!(database);
        let req = test::TestRequest::post()
            .uri("/integrations")
            .set_json(json!({
                "name": "ops",
                "type": "DISCORD",
                "url": "https://discord.com/api/webhooks/1/token"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }

    fn monitor_body(integration_ids: Vec<i64>) -> Value {
        json!({
            "name": "checkout",
            "url": "http://127.0.0.1:9/health",
            "method": "GET",
            "interval_seconds": 30,
            "threshold": 3,
            "timeout_seconds": 5,
            "integration_ids": integration_ids
        })
    }

    #[actix_web::test]
    async fn health_returns_ok() {
        let (database, _dir) = database().await;
        let app = app!(database);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn create_and_list_monitors_with_slots() {
        let (database, _dir) = database().await;
        let integration_id = create_integration(&database).await;
        let app = app!(database);

        let req = test::TestRequest::post()
            .uri("/monitors")
            .set_json(monitor_body(vec![integration_id]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["data"]["id"].as_i64().unwrap();
        assert_eq!(created["data"]["integrations"][0]["type"], "DISCORD");

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/monitors").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let monitors = body["data"].as_array().unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0]["id"], id);
        assert_eq!(monitors[0]["status"], "down");
        let slots = monitors[0]["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 25);
        assert_eq!(slots[0], json!({"timestamp": 0, "healthy": false, "monitoring_enabled": false}));
    }

    #[actix_web::test]
    async fn create_monitor_rejects_invalid_input() {
        let (database, _dir) = database().await;
        let app = app!(database);

        let req = test::TestRequest::post()
            .uri("/monitors")
            .set_json(monitor_body(Vec::new()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "At least one integration is required");

        let req = test::TestRequest::post()
            .uri("/monitors")
            .set_json(monitor_body(vec![404]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "one or more integrations not found");

        let req = test::TestRequest::post()
            .uri("/monitors")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn update_monitor_applies_explicit_patch() {
        let (database, _dir) = database().await;
        let integration_id = create_integration(&database).await;
        let app = app!(database);

        let req = test::TestRequest::post()
            .uri("/monitors")
            .set_json(monitor_body(vec![integration_id]))
            .to_request();
        let created: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let id = created["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/monitors/{id}"))
            .set_json(json!({"enabled": false, "threshold": 5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["enabled"], false);
        assert_eq!(body["data"]["threshold"], 5);
        assert_eq!(body["data"]["name"], "checkout");

        let req = test::TestRequest::put()
            .uri(&format!("/monitors/{id}"))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/monitors/999")
            .set_json(json!({"name": "ghost"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/monitors/999").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn events_list_recent_failures() {
        let (database, _dir) = database().await;
        let integration_id = create_integration(&database).await;
        let app = app!(database);

        let req = test::TestRequest::post()
            .uri("/monitors")
            .set_json(monitor_body(vec![integration_id]))
            .to_request();
        let created: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let monitor_id = created["data"]["id"].as_i64().unwrap();

        for healthy in [true, false] {
            database
                .append_attempt(&NewAttempt {
                    monitor_id,
                    healthy,
                    status_code: if healthy { 200 } else { 502 },
                    response: "bad gateway".into(),
                    latency_ms: 12,
                    created_at: 1_700_000_000,
                })
                .await
                .unwrap();
        }

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/events").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        let events = body["data"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["status_code"], 502);
        assert_eq!(events[0]["monitor_name"], "checkout");
    }

    #[actix_web::test]
    async fn integrations_search_by_prefix() {
        let (database, _dir) = database().await;
        create_integration(&database).await;
        let app = app!(database);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/integrations?search=op").to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/integrations?search=zz").to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let req = test::TestRequest::post()
            .uri("/integrations")
            .set_json(json!({"name": "bad", "type": "SLACK", "url": "not a url"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
