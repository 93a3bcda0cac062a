use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::PredictedClass;

/// Identifies one analysed piece of content for one user in one course module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey {
    pub(crate) course_module_id: i64,
    pub(crate) user_id: i64,
    pub(crate) identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SubmissionRecord {
    pub(crate) id: i64,
    pub(crate) course_module_id: i64,
    pub(crate) user_id: i64,
    pub(crate) user_email: Option<String>,
    pub(crate) identifier: String,
    pub(crate) filename: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) predicted_class: Option<String>,
    pub(crate) class_probability: Option<f64>,
    pub(crate) confidence_category: Option<String>,
    pub(crate) scan_id: Option<String>,
    pub(crate) scan_url: Option<String>,
    pub(crate) attempt_count: i32,
}

impl SubmissionRecord {
    pub(crate) fn key(&self) -> RecordKey {
        RecordKey {
            course_module_id: self.course_module_id,
            user_id: self.user_id,
            identifier: self.identifier.clone(),
        }
    }

    /// Classification fields, if the service has analysed this content.
    pub(crate) fn classification(&self) -> Option<(PredictedClass, f64)> {
        let raw = self.predicted_class.as_deref().filter(|value| !value.trim().is_empty())?;
        Some((PredictedClass::from_raw(raw), self.class_probability.unwrap_or(0.0)))
    }

    pub(crate) fn is_analyzed(&self) -> bool {
        self.classification().is_some()
    }
}

/// Classification payload extracted from a successful detection response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DetectionResult {
    pub(crate) predicted_class: String,
    pub(crate) class_probability: f64,
    pub(crate) confidence_category: Option<String>,
    pub(crate) scan_id: Option<String>,
    pub(crate) scan_url: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewSubmissionRecord {
    pub(crate) key: RecordKey,
    pub(crate) user_email: Option<String>,
    pub(crate) filename: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) result: Option<DetectionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ModuleConfig {
    pub(crate) course_module_id: i64,
    pub(crate) use_detection: bool,
    pub(crate) show_student_results: bool,
    pub(crate) external_assignment_id: Option<String>,
    pub(crate) creator_email: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
