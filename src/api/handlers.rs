use crate::error::AppError;
use crate::models::{
    BoxFilter, BoxPatch, BoxRecord, Conference, ConferenceDetail, ConferenceFilter,
    ConferenceItem, ConferencePatch, ImportItem, ItemPatch, NewBox, NewConference,
};
use crate::service::ConferenceService;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body: bulk item import.
#[derive(Debug, Deserialize)]
pub struct ImportItemsRequest {
    pub items: Vec<ImportItem>,
}

/// Response body for the import endpoint.
#[derive(Debug, Serialize)]
pub struct ImportItemsResponse {
    pub message: String,
    pub items: Vec<ConferenceItem>,
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

// ==================== Boxes ====================

pub async fn list_boxes(
    State(service): State<Arc<ConferenceService>>,
    Query(filter): Query<BoxFilter>,
) -> Result<Json<Vec<BoxRecord>>, AppError> {
    Ok(Json(service.list_boxes(filter).await?))
}

pub async fn create_box(
    State(service): State<Arc<ConferenceService>>,
    Json(new): Json<NewBox>,
) -> Result<(StatusCode, Json<BoxRecord>), AppError> {
    Ok((StatusCode::CREATED, Json(service.create_box(new).await?)))
}

pub async fn update_box(
    State(service): State<Arc<ConferenceService>>,
    Path(box_id): Path<i32>,
    Json(patch): Json<BoxPatch>,
) -> Result<Json<BoxRecord>, AppError> {
    Ok(Json(service.update_box(box_id, patch).await?))
}

pub async fn delete_box(
    State(service): State<Arc<ConferenceService>>,
    Path(box_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    service.delete_box(box_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Conferences ====================

pub async fn list_conferences(
    State(service): State<Arc<ConferenceService>>,
    Query(filter): Query<ConferenceFilter>,
) -> Result<Json<Vec<Conference>>, AppError> {
    Ok(Json(service.list_conferences(filter).await?))
}

pub async fn create_conference(
    State(service): State<Arc<ConferenceService>>,
    Json(new): Json<NewConference>,
) -> Result<(StatusCode, Json<Conference>), AppError> {
    Ok((
        StatusCode::CREATED,
        Json(service.create_conference(new).await?),
    ))
}

pub async fn get_conference(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
) -> Result<Json<ConferenceDetail>, AppError> {
    Ok(Json(service.get_conference(conference_id).await?))
}

pub async fn update_conference(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
    Json(patch): Json<ConferencePatch>,
) -> Result<Json<Conference>, AppError> {
    Ok(Json(service.update_conference(conference_id, patch).await?))
}

pub async fn delete_conference(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    service.delete_conference(conference_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Conference items ====================

pub async fn import_items(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
    Json(req): Json<ImportItemsRequest>,
) -> Result<(StatusCode, Json<ImportItemsResponse>), AppError> {
    let items = service.import_items(conference_id, req.items).await?;
    let response = ImportItemsResponse {
        message: format!("{} items imported", items.len()),
        items,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_item(
    State(service): State<Arc<ConferenceService>>,
    Path((conference_id, item_id)): Path<(i32, i32)>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<ConferenceItem>, AppError> {
    Ok(Json(service.update_item(conference_id, item_id, patch).await?))
}

pub async fn finalize_conference(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
) -> Result<Json<Conference>, AppError> {
    Ok(Json(service.finalize(conference_id).await?))
}

pub async fn export_conference(
    State(service): State<Arc<ConferenceService>>,
    Path(conference_id): Path<i32>,
) -> Result<Response, AppError> {
    let body = service.export_items(conference_id).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response())
}
