use actix_web::{HttpResponse, get, post, put, web};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use vigil_service::database::Database;
use vigil_service::database::models::{Monitor, MonitorPatch, NewMonitor, unix_now_millis};
use vigil_service::monitoring::{MonitorStatus, Slot, load_slots};
use vigil_service::validation::{validate_monitor_patch, validate_new_monitor};

use crate::error::AppError;

macros_utils::routes! {
    route list_monitors,
    route get_monitor,
    route create_monitor,
    route update_monitor,
}

/// Monitor as served to dashboards, with its recent history
#[derive(Debug, Serialize)]
struct MonitorView {
    #[serde(flatten)]
    monitor: Monitor,
    status: MonitorStatus,
    slots: Vec<Slot>,
}

async fn with_slots(database: &dyn Database, monitor: Monitor, now_ms: i64) -> MonitorView {
    // A failed history lookup should not hide the monitor itself.
    let slots = match load_slots(database, &monitor, now_ms).await {
        Ok(slots) => slots,
        Err(e) => {
            warn!(monitor_id = monitor.id, "Failed to load slots: {}", e);
            Vec::new()
        }
    };

    MonitorView { status: MonitorStatus::of(&monitor), monitor, slots }
}

#[get("/monitors")]
pub async fn list_monitors(database: web::Data<dyn Database>) -> Result<HttpResponse, AppError> {
    let now_ms = unix_now_millis();
    let monitors = database.list_monitors().await?;

    let mut views = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        views.push(with_slots(database.get_ref(), monitor, now_ms).await);
    }

    Ok(HttpResponse::Ok().json(json!({ "data": views })))
}

#[get("/monitors/{id}")]
pub async fn get_monitor(
    database: web::Data<dyn Database>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let monitor = database.get_monitor(id.into_inner()).await?.ok_or(AppError::NotFound("monitor"))?;
    let view = with_slots(database.get_ref(), monitor, unix_now_millis()).await;

    Ok(HttpResponse::Ok().json(json!({ "data": view })))
}

#[post("/monitors")]
pub async fn create_monitor(
    database: web::Data<dyn Database>,
    body: web::Json<NewMonitor>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    validate_new_monitor(&request)
        .to_result()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let monitor = database.create_monitor(&request).await?;

    Ok(HttpResponse::Created()
        .json(json!({ "message": "monitor created successfully", "data": monitor })))
}

#[put("/monitors/{id}")]
pub async fn update_monitor(
    database: web::Data<dyn Database>,
    id: web::Path<i64>,
    body: web::Json<MonitorPatch>,
) -> Result<HttpResponse, AppError> {
    let patch = body.into_inner();
    validate_monitor_patch(&patch)
        .to_result()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let monitor = database.update_monitor(id.into_inner(), &patch).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "monitor updated successfully", "data": monitor })))
}
