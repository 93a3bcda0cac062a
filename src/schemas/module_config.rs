use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::ModuleConfig;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ModuleConfigUpdate {
    /// Host user saving the module form; becomes the assignment creator on first enable.
    #[validate(range(min = 1, message = "actor_id must be positive"))]
    pub(crate) actor_id: i64,
    pub(crate) use_detection: bool,
    #[serde(default)]
    pub(crate) show_student_results: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModuleConfigResponse {
    pub(crate) course_module_id: i64,
    pub(crate) use_detection: bool,
    pub(crate) show_student_results: bool,
    pub(crate) external_assignment_id: Option<String>,
    pub(crate) creator_email: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ModuleConfigResponse {
    pub(crate) fn from_db(config: ModuleConfig) -> Self {
        Self {
            course_module_id: config.course_module_id,
            use_detection: config.use_detection,
            show_student_results: config.show_student_results,
            external_assignment_id: config.external_assignment_id,
            creator_email: config.creator_email,
            created_at: format_primitive(config.created_at),
            updated_at: format_primitive(config.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfigureResponse {
    pub(crate) outcome: &'static str,
    pub(crate) config: Option<ModuleConfigResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DisclosureResponse {
    pub(crate) course_module_id: i64,
    pub(crate) disclosure: Option<String>,
}
