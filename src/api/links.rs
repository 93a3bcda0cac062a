use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::HostToken;
use crate::core::context::RequestContext;
use crate::core::state::AppState;
use crate::db::models::RecordKey;
use crate::schemas::links::{LinkItem, LinkResponse, LinksRequest, LinksResponse};
use crate::services::account_notice::AccountNotice;
use crate::services::content_identifier;
use crate::services::result_presenter::{DisplayFragment, ResultPresenter};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(render_links))
}

/// Renders detection badges for the submissions on one host page.
async fn render_links(
    _host: HostToken,
    State(state): State<AppState>,
    Json(payload): Json<LinksRequest>,
) -> Result<Json<LinksResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut context = RequestContext::new();
    let notice = if payload.viewer_can_grade {
        let viewer = state
            .host()
            .user_profile(payload.viewer_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load viewer"))?;
        match viewer {
            Some(viewer) => {
                AccountNotice::new(&state)
                    .grading_view_notice(&mut context, &viewer, payload.viewer_can_grade)
                    .await
            }
            None => None,
        }
    } else {
        None
    };

    let presenter = ResultPresenter::new(&state);
    let logo_url = state.settings().detection().logo_url.as_deref();
    let mut links = Vec::with_capacity(payload.items.len());

    for item in &payload.items {
        let identifier = resolve_identifier(&state, item).await?;
        let fragment = match &identifier {
            Some(identifier) => {
                let key = RecordKey {
                    course_module_id: item.course_module_id,
                    user_id: item.user_id,
                    identifier: identifier.clone(),
                };
                presenter.render(&key, payload.viewer_can_see_report).await
            }
            None => DisplayFragment::Empty,
        };

        links.push(LinkResponse {
            course_module_id: item.course_module_id,
            user_id: item.user_id,
            identifier,
            text: fragment.text(),
            html: fragment.to_html(logo_url),
            fragment,
        });
    }

    tracing::debug!(
        request_id = %context.request_id(),
        viewer_id = payload.viewer_id,
        links = links.len(),
        "Rendered detection links"
    );

    Ok(Json(LinksResponse { notice, links }))
}

/// Same identifier the pipeline computed when the content was submitted.
async fn resolve_identifier(state: &AppState, item: &LinkItem) -> Result<Option<String>, ApiError> {
    if let Some(hash) = item.content_hash.as_deref().map(str::trim).filter(|hash| !hash.is_empty()) {
        return Ok(Some(content_identifier::for_file(Some(hash), &[])));
    }

    if let Some(pathname_hash) =
        item.pathname_hash.as_deref().map(str::trim).filter(|hash| !hash.is_empty())
    {
        let file = state
            .host()
            .file_by_pathname_hash(pathname_hash)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load file"))?;
        return Ok(file
            .filter(|file| !file.is_directory())
            .map(|file| content_identifier::for_file(file.content_hash.as_deref(), &file.content)));
    }

    if let Some(content) = item.content.as_deref().filter(|content| !content.trim().is_empty()) {
        return Ok(Some(content_identifier::for_text(content)));
    }

    Err(ApiError::BadRequest(
        "each item needs content_hash, pathname_hash or content".to_string(),
    ))
}
