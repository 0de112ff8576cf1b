//! HTTP handlers for printing and template management.
//!
//! Thin translations between HTTP payloads and the library: decode the
//! request, call the facade or store, map errors onto status codes. All
//! printing goes through the facade, which serializes jobs internally.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;
use serde_json::json;

use super::state::AppState;
use crate::error::{MiniLabelError, RenderError, StoreError};
use crate::template::PrintTemplate;

type HandlerError = (StatusCode, String);

/// Map library failures onto HTTP statuses.
fn status_for(error: &MiniLabelError) -> StatusCode {
    match error {
        MiniLabelError::Render(RenderError::InvalidTemplate(_)) => StatusCode::BAD_REQUEST,
        MiniLabelError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        MiniLabelError::Store(StoreError::EmptyId) => StatusCode::BAD_REQUEST,
        MiniLabelError::Image(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: MiniLabelError) -> HandlerError {
    (status_for(&error), error.to_string())
}

// ============================================================================
// PRINT ENDPOINTS
// ============================================================================

/// Body of `POST /api/print`.
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    pub image_base64: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Body of `POST /api/print/dynamic` and `POST /api/render/dynamic`.
#[derive(Debug, Deserialize)]
pub struct DynamicPrintRequest {
    pub template_id: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Handle `POST /api/print`: decode a base64 raster and print it.
pub async fn print_static(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PrintRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if request.image_base64.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no image data".to_string()));
    }

    // Accept both raw base64 and data-URI payloads.
    let payload = request
        .image_base64
        .rsplit_once(',')
        .map(|(_, data)| data)
        .unwrap_or(&request.image_base64);

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| reject(MiniLabelError::Image(format!("invalid base64: {e}"))))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| reject(MiniLabelError::Image(format!("undecodable image: {e}"))))?;

    // The caller may request an exact size; otherwise the raster prints
    // as-is (the transport warns on width mismatches).
    let raster = if request.width > 0 && request.height > 0 {
        decoded
            .resize_exact(request.width, request.height, image::imageops::FilterType::Triangle)
            .to_rgba8()
    } else {
        decoded.to_rgba8()
    };

    state.printer.print_image(&raster).await.map_err(reject)?;
    Ok(Json(json!({ "message": "print job sent" })))
}

/// Handle `POST /api/print/dynamic`: render a stored template with
/// substitutions and print it.
pub async fn print_dynamic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DynamicPrintRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let template = state
        .store
        .load(&request.template_id)
        .map_err(|e| reject(e.into()))?;

    state
        .printer
        .print_template(&template, &request.data)
        .await
        .map_err(reject)?;

    Ok(Json(json!({
        "message": "dynamic print sent",
        "template_id": template.id,
        "substituted_keys": request.data.keys().collect::<Vec<_>>(),
    })))
}

/// Handle `POST /api/render/dynamic`: same pipeline as a dynamic print,
/// returned as a PNG preview instead of transmitted.
pub async fn render_dynamic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DynamicPrintRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let template = state
        .store
        .load(&request.template_id)
        .map_err(|e| reject(e.into()))?;

    let image = state
        .printer
        .renderer()
        .render(&template, &request.data)
        .map_err(|e| reject(e.into()))?;
    let png = crate::render::encode_png(&image).map_err(|e| reject(e.into()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

// ============================================================================
// TEMPLATE CRUD
// ============================================================================

/// Handle `GET /api/templates`.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let templates = state.store.list().map_err(|e| reject(e.into()))?;
    Ok(Json(templates))
}

/// Handle `POST /api/templates`: persist a new template, minting an id.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(mut template): Json<PrintTemplate>,
) -> Result<impl IntoResponse, HandlerError> {
    template
        .validate()
        .map_err(|e| reject(MiniLabelError::Render(RenderError::InvalidTemplate(e))))?;
    let id = state.store.save(&mut template).map_err(|e| reject(e.into()))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Handle `PUT /api/templates/:id`: overwrite an existing record.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut template): Json<PrintTemplate>,
) -> Result<impl IntoResponse, HandlerError> {
    template
        .validate()
        .map_err(|e| reject(MiniLabelError::Render(RenderError::InvalidTemplate(e))))?;
    // The path, not the body, names the record.
    template.id = id;
    state
        .store
        .update(&mut template)
        .map_err(|e| reject(e.into()))?;
    Ok(Json(json!({ "id": template.id })))
}

/// Handle `DELETE /api/templates/:id`.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state.store.delete(&id).map_err(|e| reject(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
