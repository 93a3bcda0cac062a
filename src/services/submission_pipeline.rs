use serde::Serialize;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{ModuleConfig, NewSubmissionRecord, RecordKey};
use crate::services::content_identifier;
use crate::services::detection_client::{FileUpload, SubmissionMetadata};
use crate::services::errors::DetectionError;
use crate::services::host_platform::{HostFile, ModuleInfo, UserProfile};
use crate::services::module_settings::ModuleSettings;
use crate::services::result_store::UpsertOutcome;

/// Earlier group records examined when attributing a team submission.
pub(crate) const GROUP_LOOKAHEAD: usize = 10;

const FILE_COMPONENT: &str = "assignsubmission_file";
const TEXT_COMPONENT: &str = "assignsubmission_onlinetext";

/// A file shipped inside the event instead of referenced by pathname hash.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InlineFile {
    pub(crate) filename: String,
    pub(crate) mimetype: Option<String>,
    pub(crate) content_hash: Option<String>,
    pub(crate) content: Vec<u8>,
}

/// Upload or text submission reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SubmissionEvent {
    pub(crate) course_module_id: i64,
    pub(crate) user_id: i64,
    pub(crate) component: String,
    pub(crate) content: Option<String>,
    pub(crate) pathname_hashes: Vec<String>,
    pub(crate) files: Vec<InlineFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmissionState {
    New,
    Submitting,
    Analyzed,
    /// Terminal for this invocation; the record stays without classification.
    Failed,
    CacheHit,
    Skipped,
}

impl SubmissionState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmissionState::New => "new",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Analyzed => "analyzed",
            SubmissionState::Failed => "failed",
            SubmissionState::CacheHit => "cache_hit",
            SubmissionState::Skipped => "skipped",
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, SubmissionState::New | SubmissionState::Submitting)
    }

    pub(crate) fn can_transition_to(self, next: SubmissionState) -> bool {
        matches!(
            (self, next),
            (SubmissionState::New, SubmissionState::Submitting)
                | (SubmissionState::New, SubmissionState::CacheHit)
                | (SubmissionState::New, SubmissionState::Skipped)
                | (SubmissionState::New, SubmissionState::Failed)
                | (SubmissionState::Submitting, SubmissionState::Analyzed)
                | (SubmissionState::Submitting, SubmissionState::Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmissionKind {
    File,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SubmissionReport {
    pub(crate) kind: SubmissionKind,
    pub(crate) state: SubmissionState,
    pub(crate) identifier: Option<String>,
    pub(crate) filename: Option<String>,
    pub(crate) attributed_user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct EventReport {
    pub(crate) course_module_id: i64,
    pub(crate) user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) skipped: Option<String>,
    pub(crate) submissions: Vec<SubmissionReport>,
}

impl EventReport {
    fn skipped(event: &SubmissionEvent, reason: impl Into<String>) -> Self {
        Self {
            course_module_id: event.course_module_id,
            user_id: event.user_id,
            skipped: Some(reason.into()),
            submissions: Vec::new(),
        }
    }
}

/// Everything resolved once per event and shared by each of its submissions.
struct EventContext {
    config: ModuleConfig,
    module: ModuleInfo,
    submitter: UserProfile,
    attributed_user_id: i64,
}

impl EventContext {
    fn metadata(&self) -> SubmissionMetadata {
        SubmissionMetadata {
            assignment_name: self.module.name.clone(),
            assignment_id: self.config.external_assignment_id.clone(),
            user_id: self.submitter.id,
            user_name: self.submitter.username.clone(),
            user_email: self.submitter.email.clone().unwrap_or_default(),
        }
    }
}

enum Payload<'p> {
    File(FileUpload),
    Text(&'p str),
}

/// Sends new submission content to the detection service and records the outcome.
///
/// Nothing here fails the host's upload: every error ends as a logged
/// diagnostic and a report entry.
#[derive(Clone, Copy)]
pub(crate) struct SubmissionPipeline<'a> {
    state: &'a AppState,
}

impl<'a> SubmissionPipeline<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub(crate) async fn handle_event(&self, event: &SubmissionEvent) -> EventReport {
        let context = match self.prepare(event).await {
            Ok(Some(context)) => context,
            Ok(None) => return EventReport::skipped(event, "detection not in use for this module"),
            Err(err) => {
                tracing::warn!(
                    course_module_id = event.course_module_id,
                    user_id = event.user_id,
                    error = %err,
                    "Submission event not processed"
                );
                metrics::record_submission_outcome("ignored");
                return EventReport::skipped(event, err.to_string());
            }
        };

        let mut submissions = Vec::new();

        for pathname_hash in &event.pathname_hashes {
            submissions.push(self.process_stored_file(&context, event, pathname_hash).await);
        }
        for file in &event.files {
            let identifier =
                content_identifier::for_file(file.content_hash.as_deref(), &file.content);
            let upload = FileUpload {
                filename: file.filename.clone(),
                mimetype: file.mimetype.clone(),
                content: file.content.clone(),
            };
            submissions.push(self.process(&context, event, identifier, Payload::File(upload)).await);
        }

        if let Some(text) = event.content.as_deref().filter(|text| !text.trim().is_empty()) {
            let plain = content_identifier::strip_tags(text);
            let plain = plain.trim();
            if plain.is_empty() {
                tracing::info!(
                    course_module_id = event.course_module_id,
                    user_id = event.user_id,
                    "Text submission has no content outside markup"
                );
                submissions.push(finish(
                    &context,
                    SubmissionKind::Text,
                    None,
                    None,
                    SubmissionState::Skipped,
                    Some("no text outside markup".to_string()),
                ));
            } else {
                let identifier = content_identifier::for_text(text);
                submissions.push(self.process(&context, event, identifier, Payload::Text(plain)).await);
            }
        }

        EventReport {
            course_module_id: event.course_module_id,
            user_id: event.user_id,
            skipped: None,
            submissions,
        }
    }

    async fn prepare(&self, event: &SubmissionEvent) -> Result<Option<EventContext>, DetectionError> {
        let detection = self.state.settings().detection();
        if !detection.is_configured() {
            return Err(DetectionError::NotConfigured("detection is disabled or missing credentials"));
        }

        let Some((config, module)) =
            ModuleSettings::new(self.state).active_module(event.course_module_id).await?
        else {
            return Ok(None);
        };
        if !detection.module_enabled(&module.module_type) {
            return Err(DetectionError::NotConfigured("detection is not enabled for this module type"));
        }

        let submitter = self
            .state
            .host()
            .user_profile(event.user_id)
            .await?
            .ok_or_else(|| DetectionError::NotFound(format!("user {}", event.user_id)))?;

        let attributed_user_id = if module.team_submission
            && matches!(event.component.as_str(), FILE_COMPONENT | TEXT_COMPONENT)
        {
            self.resolve_group_attribution(&module, event.user_id).await?
        } else {
            event.user_id
        };

        Ok(Some(EventContext { config, module, submitter, attributed_user_id }))
    }

    /// Picks the user a team submission is recorded under.
    ///
    /// Looks at the earliest stored records of the submitter's only group: the
    /// first one written by the submitter keeps the submitter, the first one
    /// written by a single-group member hands over that member's id. Members
    /// of several groups are passed over. After `GROUP_LOOKAHEAD` candidates
    /// the submitter keeps attribution.
    pub(crate) async fn resolve_group_attribution(
        &self,
        module: &ModuleInfo,
        user_id: i64,
    ) -> Result<i64, DetectionError> {
        let host = self.state.host();
        let groups = host.user_groups(module.course_id, user_id).await?;
        let [group_id] = groups.as_slice() else {
            return Ok(user_id);
        };

        let members = host.group_members(*group_id).await?;
        let candidates = self.state.store().list_records_for_users(module.id, &members).await?;

        for candidate in candidates.iter().take(GROUP_LOOKAHEAD) {
            if candidate.user_id == user_id {
                return Ok(user_id);
            }
            let candidate_groups = host.user_groups(module.course_id, candidate.user_id).await?;
            if candidate_groups.len() == 1 {
                tracing::debug!(
                    course_module_id = module.id,
                    user_id,
                    attributed_user_id = candidate.user_id,
                    "Team submission attributed to earlier group member"
                );
                return Ok(candidate.user_id);
            }
        }

        Ok(user_id)
    }

    async fn process_stored_file(
        &self,
        context: &EventContext,
        event: &SubmissionEvent,
        pathname_hash: &str,
    ) -> SubmissionReport {
        let file = match self.state.host().file_by_pathname_hash(pathname_hash).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                tracing::warn!(
                    course_module_id = event.course_module_id,
                    user_id = event.user_id,
                    pathname_hash,
                    "Submitted file not found on host"
                );
                return skipped_file(context, None, "file not found");
            }
            Err(err) => {
                tracing::error!(
                    course_module_id = event.course_module_id,
                    pathname_hash,
                    error = %err,
                    "Failed to load submitted file"
                );
                return finish(context, SubmissionKind::File, None, None, SubmissionState::Failed, Some(err.to_string()));
            }
        };

        if file.is_directory() {
            return skipped_file(context, Some(&file), "directory entry");
        }
        tracing::debug!(
            pathname_hash = %file.pathname_hash,
            filepath = %file.filepath,
            filename = %file.filename,
            "Resolved submitted file"
        );

        let identifier = content_identifier::for_file(file.content_hash.as_deref(), &file.content);
        let HostFile { filename, mimetype, content, .. } = file;
        let upload = FileUpload { filename, mimetype, content };
        self.process(context, event, identifier, Payload::File(upload)).await
    }

    async fn process(
        &self,
        context: &EventContext,
        event: &SubmissionEvent,
        identifier: String,
        payload: Payload<'_>,
    ) -> SubmissionReport {
        let kind = match payload {
            Payload::File(_) => SubmissionKind::File,
            Payload::Text(_) => SubmissionKind::Text,
        };
        let key = RecordKey {
            course_module_id: event.course_module_id,
            user_id: context.attributed_user_id,
            identifier: identifier.clone(),
        };
        let (filename, stored_content) = match &payload {
            Payload::File(upload) => (upload.filename.clone(), None),
            Payload::Text(text) => {
                let stored = if event.component == TEXT_COMPONENT {
                    content_identifier::wrap_no_overflow(text)
                } else {
                    text.to_string()
                };
                (content_identifier::text_filename(&identifier), Some(stored))
            }
        };

        let mut state = SubmissionState::New;
        let report = |state: SubmissionState, detail: Option<String>| {
            finish(context, kind, Some(identifier.clone()), Some(filename.clone()), state, detail)
        };

        match self.state.store().find_record(&key).await {
            Ok(Some(_)) => {
                tracing::debug!(
                    course_module_id = key.course_module_id,
                    user_id = key.user_id,
                    identifier = %key.identifier,
                    "Content already submitted"
                );
                return report(SubmissionState::CacheHit, None);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(
                    course_module_id = key.course_module_id,
                    user_id = key.user_id,
                    identifier = %key.identifier,
                    error = %err,
                    "Failed to look up submission record"
                );
                return report(SubmissionState::Failed, Some(err.to_string()));
            }
        }

        advance(&mut state, SubmissionState::Submitting);
        let metadata = context.metadata();
        let response = match &payload {
            Payload::File(upload) => self.state.detection().submit_file(upload, &metadata).await,
            Payload::Text(text) => self.state.detection().submit_text(text, &metadata).await,
        };

        let (result, detail) = match response {
            Ok(result) => {
                advance(&mut state, SubmissionState::Analyzed);
                (Some(result), None)
            }
            Err(err) => {
                advance(&mut state, SubmissionState::Failed);
                tracing::warn!(
                    course_module_id = key.course_module_id,
                    user_id = key.user_id,
                    identifier = %key.identifier,
                    error = %err,
                    "Detection request failed; stored without classification"
                );
                (None, Some(err.to_string()))
            }
        };

        let record = NewSubmissionRecord {
            key,
            user_email: context.submitter.email.clone(),
            filename: Some(filename.clone()),
            content: stored_content,
            submitted_at: primitive_now_utc(),
            result,
        };

        match self.state.store().upsert_record(&record).await {
            Ok(UpsertOutcome::Unchanged) => {
                tracing::debug!(identifier = %record.key.identifier, "Record written concurrently; kept existing");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(
                    course_module_id = record.key.course_module_id,
                    user_id = record.key.user_id,
                    identifier = %record.key.identifier,
                    error = %err,
                    "Failed to store submission record"
                );
                return report(SubmissionState::Failed, Some(err.to_string()));
            }
        }

        report(state, detail)
    }
}

fn advance(state: &mut SubmissionState, next: SubmissionState) {
    debug_assert!(state.can_transition_to(next), "{state:?} -> {next:?}");
    *state = next;
}

fn skipped_file(context: &EventContext, file: Option<&HostFile>, reason: &str) -> SubmissionReport {
    finish(
        context,
        SubmissionKind::File,
        None,
        file.map(|file| file.filename.clone()),
        SubmissionState::Skipped,
        Some(reason.to_string()),
    )
}

fn finish(
    context: &EventContext,
    kind: SubmissionKind,
    identifier: Option<String>,
    filename: Option<String>,
    state: SubmissionState,
    detail: Option<String>,
) -> SubmissionReport {
    debug_assert!(state.is_terminal());
    metrics::record_submission_outcome(state.as_str());
    SubmissionReport {
        kind,
        state,
        identifier,
        filename,
        attributed_user_id: context.attributed_user_id,
        detail,
    }
}
