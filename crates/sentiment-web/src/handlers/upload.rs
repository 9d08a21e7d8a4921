//! Upload-and-analyze endpoint

use crate::{
    api_client::{CSRF_HEADER, FILE_FIELD, Upload},
    controller::SubmitOutcome,
    state::AppState,
    view::RegionSnapshot,
};
use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Form field carrying the anti-forgery token; never forwarded upstream
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

/// Response for a submission
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Outcome name, e.g. `rendered` or `superseded`
    pub outcome: &'static str,
    /// User-facing message for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Results region to apply in the browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<RegionSnapshot>,
}

/// Response for a cancel request
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether a submission was in flight
    pub cancelled: bool,
}

/// Response for a rejected request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

fn csrf_rejection() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: "CSRF token missing or incorrect.".to_string(),
        }),
    )
        .into_response()
}

fn has_valid_token(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| token == state.csrf_token)
}

const fn status_for(outcome: &SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Rendered => StatusCode::OK,
        SubmitOutcome::BackendError(_) | SubmitOutcome::MissingFile => StatusCode::BAD_REQUEST,
        SubmitOutcome::Failed(_) => StatusCode::BAD_GATEWAY,
        SubmitOutcome::Superseded | SubmitOutcome::Cancelled => StatusCode::CONFLICT,
    }
}

/// Keep a text form field for the backend, logging the ones that fail to decode
fn push_text_field<E: std::fmt::Display>(
    fields: &mut Vec<(String, String)>,
    name: String,
    text: Result<String, E>,
) {
    match text {
        Ok(text) => fields.push((name, text)),
        Err(e) => warn!(field = %name, error = %e, "skipping undecodable form field"),
    }
}

/// Read the multipart body into an upload; `None` when no file was chosen
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, String> {
    let mut upload: Option<Upload> = None;
    let mut fields = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                match name.as_str() {
                    FILE_FIELD => {
                        let file_name = field.file_name().unwrap_or_default().to_string();
                        let content_type = field.content_type().map(str::to_string);
                        let bytes = field
                            .bytes()
                            .await
                            .map_err(|e| format!("Failed to read file data: {e}"))?;
                        // Browsers send an empty, unnamed part when nothing was selected
                        if !file_name.is_empty() || !bytes.is_empty() {
                            upload = Some(Upload {
                                file_name,
                                content_type,
                                bytes,
                                ..Upload::default()
                            });
                        }
                    }
                    CSRF_FIELD => {}
                    _ => {
                        let text = field.text().await;
                        push_text_field(&mut fields, name, text);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return Err(format!("Failed to parse multipart data: {e}")),
        }
    }

    Ok(upload.map(|upload| Upload { fields, ..upload }))
}

/// Handle a spreadsheet upload from the page
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !has_valid_token(&state, &headers) {
        warn!("upload rejected: bad anti-forgery token");
        return csrf_rejection();
    }

    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            error!(%message, "invalid upload body");
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
        }
    };

    if let Some(upload) = &upload {
        info!(file = %upload.file_name, bytes = upload.bytes.len(), "received upload");
    }
    state
        .controller
        .select_file(upload.as_ref().map(|u| u.file_name.as_str()));

    let (outcome, view) = state.controller.submit_with_view(upload).await;
    let response = UploadResponse {
        outcome: outcome.kind(),
        error: outcome.message().map(str::to_string),
        view,
    };
    (status_for(&outcome), Json(response)).into_response()
}

/// Abort the submission in flight
pub async fn cancel(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !has_valid_token(&state, &headers) {
        return csrf_rejection();
    }

    let cancelled = state.controller.cancel();
    Json(CancelResponse { cancelled }).into_response()
}
