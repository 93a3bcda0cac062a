use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::result_presenter::DisplayFragment;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LinksRequest {
    #[validate(range(min = 1, message = "viewer_id must be positive"))]
    pub(crate) viewer_id: i64,
    #[serde(default)]
    pub(crate) viewer_can_see_report: bool,
    #[serde(default)]
    pub(crate) viewer_can_grade: bool,
    #[validate(length(min = 1, max = 200, message = "between 1 and 200 items per request"), nested)]
    pub(crate) items: Vec<LinkItem>,
}

/// One submission shown on the host page: a file (by hash) or inline text.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct LinkItem {
    #[validate(range(min = 1, message = "course_module_id must be positive"))]
    pub(crate) course_module_id: i64,
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub(crate) user_id: i64,
    #[serde(default)]
    pub(crate) content_hash: Option<String>,
    #[serde(default)]
    pub(crate) pathname_hash: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LinkResponse {
    pub(crate) course_module_id: i64,
    pub(crate) user_id: i64,
    pub(crate) identifier: Option<String>,
    pub(crate) fragment: DisplayFragment,
    pub(crate) text: String,
    pub(crate) html: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LinksResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) notice: Option<String>,
    pub(crate) links: Vec<LinkResponse>,
}
