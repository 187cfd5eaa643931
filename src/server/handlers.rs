//! Route handlers.
//!
//! Every handler holds the store lock only inside [`DocumentStore`] calls,
//! never across an `.await`.
//!
//! [`DocumentStore`]: crate::session::DocumentStore

use super::error::ApiError;
use super::state::SharedState;
use super::template;
use super::upload;
use crate::error::{HekwerkError, ShapeIssue};
use crate::load::load_drawing;
use crate::measure::PageReport;
use crate::report::CSV_FILE_NAME;
use crate::scale::ignored_objects;
use crate::session::{MeasureInput, ScaleInput, SessionSummary};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub async fn index(State(state): State<SharedState>) -> Html<String> {
    template::render_index(&state.config)
}

pub async fn healthz(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "pdf_renderer": state.renderer,
        "documents": state.store.len(),
    }))
}

pub async fn upload(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let file = upload::parse_multipart(multipart).await?;
    let drawing = load_drawing(file.data, &file.filename, &state.config).await?;
    let summary = state.store.insert(drawing);
    info!(
        "Document {} uploaded: '{}' ({} pages)",
        summary.id,
        summary.drawing.filename,
        summary.drawing.page_count()
    );
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn page_image(
    State(state): State<SharedState>,
    path: Result<Path<(String, usize)>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((id, page)) = path.map_err(path_rejected)?;
    let page = state.store.page(parse_id(&id)?, page)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        page.png,
    ))
}

#[derive(Debug, Serialize)]
pub struct ScaleResponse {
    pub page: usize,
    pub px_per_mm: f64,
    pub skipped: Vec<ShapeIssue>,
}

pub async fn calibrate(
    State(state): State<SharedState>,
    path: Result<Path<(String, usize)>, PathRejection>,
    payload: Result<Json<ScaleInput>, JsonRejection>,
) -> Result<Json<ScaleResponse>, ApiError> {
    let Path((id, page)) = path.map_err(path_rejected)?;
    let Json(input) = payload.map_err(json_rejected)?;
    let scale = state.store.calibrate(parse_id(&id)?, page, &input)?;
    Ok(Json(ScaleResponse {
        page,
        px_per_mm: scale.px_per_mm,
        skipped: ignored_objects(&input.objects),
    }))
}

pub async fn measure(
    State(state): State<SharedState>,
    path: Result<Path<(String, usize)>, PathRejection>,
    payload: Result<Json<MeasureInput>, JsonRejection>,
) -> Result<Json<PageReport>, ApiError> {
    let Path((id, page)) = path.map_err(path_rejected)?;
    let Json(input) = payload.map_err(json_rejected)?;
    let report = state
        .store
        .measure(parse_id(&id)?, page, &input, &state.measure_defaults())?;
    Ok(Json(report))
}

pub async fn export_csv(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let table = state.store.results(parse_id(&id)?)?;
    let csv = table.to_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", CSV_FILE_NAME),
            ),
        ],
        csv,
    ))
}

pub async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let uuid = parse_id(&id)?;
    if state.store.remove(uuid) {
        info!("Document {} removed", uuid);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HekwerkError::DocumentNotFound { id }.into())
    }
}

/// A malformed id can never name a live document.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| HekwerkError::DocumentNotFound { id: id.to_string() }.into())
}

fn json_rejected(e: JsonRejection) -> ApiError {
    ApiError::Rejected {
        status: e.status(),
        message: e.body_text(),
    }
}

fn path_rejected(e: PathRejection) -> ApiError {
    ApiError::Rejected {
        status: e.status(),
        message: e.body_text(),
    }
}
