use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::submission_pipeline::{InlineFile, SubmissionEvent};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionEventRequest {
    #[validate(range(min = 1, message = "course_module_id must be positive"))]
    pub(crate) course_module_id: i64,
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub(crate) user_id: i64,
    #[validate(length(min = 1, max = 100, message = "component must be 1-100 characters"))]
    pub(crate) component: String,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default, alias = "fileHashes")]
    #[validate(length(max = 100, message = "at most 100 files per event"))]
    pub(crate) pathname_hashes: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "at most 20 inline files per event"), nested)]
    pub(crate) files: Vec<InlineFileDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct InlineFileDto {
    #[validate(length(min = 1, max = 255, message = "filename must be 1-255 characters"))]
    pub(crate) filename: String,
    #[serde(default)]
    pub(crate) mimetype: Option<String>,
    #[serde(default)]
    pub(crate) content_hash: Option<String>,
    pub(crate) content_base64: String,
}

impl SubmissionEventRequest {
    pub(crate) fn into_event(self) -> Result<SubmissionEvent, String> {
        let files = self
            .files
            .into_iter()
            .map(|file| {
                let content = STANDARD
                    .decode(file.content_base64.trim())
                    .map_err(|err| format!("file '{}' is not valid base64: {err}", file.filename))?;
                Ok(InlineFile {
                    filename: file.filename,
                    mimetype: file.mimetype,
                    content_hash: file.content_hash,
                    content,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(SubmissionEvent {
            course_module_id: self.course_module_id,
            user_id: self.user_id,
            component: self.component,
            content: self.content,
            pathname_hashes: self
                .pathname_hashes
                .into_iter()
                .map(|hash| hash.trim().to_string())
                .filter(|hash| !hash.is_empty())
                .collect(),
            files,
        })
    }
}
