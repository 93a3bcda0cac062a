use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::HostToken;
use crate::core::state::AppState;
use crate::schemas::event::SubmissionEventRequest;
use crate::services::submission_pipeline::{EventReport, SubmissionPipeline};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_event))
}

/// Runs detection for one host submission event.
///
/// Once the payload is valid the answer is always 202: detection problems show
/// up in the per-submission report, never as a failed request.
async fn submit_event(
    _host: HostToken,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionEventRequest>,
) -> Result<(StatusCode, Json<EventReport>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let event = payload.into_event().map_err(ApiError::BadRequest)?;

    let report = SubmissionPipeline::new(&state).handle_event(&event).await;

    tracing::info!(
        course_module_id = report.course_module_id,
        user_id = report.user_id,
        submissions = report.submissions.len(),
        skipped = report.skipped.as_deref().unwrap_or_default(),
        "Submission event handled"
    );

    Ok((StatusCode::ACCEPTED, Json(report)))
}
