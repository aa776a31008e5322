use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::json;

use vigil_service::database::Database;
use vigil_service::database::models::NewIntegration;
use vigil_service::validation::validate_new_integration;

use crate::error::AppError;

macros_utils::routes! {
    route list_integrations,
    route create_integration,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    search: Option<String>,
}

#[get("/integrations")]
pub async fn list_integrations(
    database: web::Data<dyn Database>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let search = query.search.as_deref().filter(|s| !s.is_empty());
    let integrations = database.list_integrations(search).await?;

    Ok(HttpResponse::Ok().json(json!({ "data": integrations })))
}

#[post("/integrations")]
pub async fn create_integration(
    database: web::Data<dyn Database>,
    body: web::Json<NewIntegration>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    validate_new_integration(&request)
        .to_result()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let integration = database.create_integration(&request).await?;

    Ok(HttpResponse::Created()
        .json(json!({ "message": "integration created successfully", "data": integration })))
}
