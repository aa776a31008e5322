//! A small service whose health checks can be broken on demand, for trying
//! monitors and alerts end to end.
//!
//! `POST /toggle?kind=database|queue` flips the matching check between
//! healthy and failing; `GET /slow?ms=N` answers after `N` milliseconds.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actix_web::{App, HttpResponse, HttpServer, get, post, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const DEFAULT_PORT: u16 = 6276;

/// Upper bound for `/slow` so a typo cannot park a worker for hours.
const MAX_DELAY_MS: u64 = 120_000;

/// Which checks are currently failing
#[derive(Debug, Default)]
pub struct FaultPlan {
    database: AtomicBool,
    queue: AtomicBool,
}

impl FaultPlan {
    fn flag(&self, kind: &str) -> Option<&AtomicBool> {
        match kind {
            "database" => Some(&self.database),
            "queue" => Some(&self.queue),
            _ => None,
        }
    }

    /// Flip a check, returning its new failing state
    fn toggle(&self, kind: &str) -> Option<bool> {
        self.flag(kind).map(|flag| !flag.fetch_xor(true, Ordering::SeqCst))
    }

    fn is_failing(&self, kind: &str) -> bool {
        self.flag(kind).is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn check_response(failing: bool, what: &str) -> HttpResponse {
    if failing {
        HttpResponse::InternalServerError()
            .json(json!({ "status": "error", "message": format!("{what} check failed") }))
    } else {
        HttpResponse::Ok().json(json!({ "status": "ok", "message": format!("{what} is healthy") }))
    }
}

#[get("/check-database")]
async fn check_database(plan: web::Data<FaultPlan>) -> HttpResponse {
    check_response(plan.is_failing("database"), "database")
}

#[get("/queue-check")]
async fn queue_check(plan: web::Data<FaultPlan>) -> HttpResponse {
    check_response(plan.is_failing("queue"), "queue")
}

#[derive(Debug, Deserialize)]
struct ToggleQuery {
    kind: String,
}

#[post("/toggle")]
async fn toggle(plan: web::Data<FaultPlan>, query: web::Query<ToggleQuery>) -> HttpResponse {
    match plan.toggle(&query.kind) {
        Some(failing) => {
            info!(kind = %query.kind, failing, "Fault toggled");
            HttpResponse::Ok().json(json!({ "status": "ok", "kind": query.kind, "failing": failing }))
        }
        None => HttpResponse::BadRequest()
            .json(json!({ "status": "error", "message": "invalid kind" })),
    }
}

#[derive(Debug, Deserialize)]
struct SlowQuery {
    #[serde(default)]
    ms: u64,
}

#[get("/slow")]
async fn slow(query: web::Query<SlowQuery>) -> HttpResponse {
    let delay = query.ms.min(MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    HttpResponse::Ok().json(json!({ "status": "ok", "delayed_ms": delay }))
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(check_database).service(queue_check).service(toggle).service(slow);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    logger::init_tracing();

    let port = env::var("FAKE_TARGET_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let plan = web::Data::new(FaultPlan::default());
    info!("Fake target listening on port {}", port);

    HttpServer::new(move || App::new().app_data(plan.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
