use actix_web::{HttpResponse, get, web};
use serde_json::json;

use vigil_service::database::Database;

use crate::error::AppError;

macros_utils::routes! {
    route list_events,
}

/// Size of the failure feed
const EVENT_LIMIT: usize = 20;

/// Latest unhealthy attempts across all monitors
#[get("/events")]
pub async fn list_events(database: web::Data<dyn Database>) -> Result<HttpResponse, AppError> {
    let events = database.recent_failures(EVENT_LIMIT).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": events })))
}
