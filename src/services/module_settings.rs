use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ModuleConfig;
use crate::services::errors::DetectionError;
use crate::services::host_platform::{ModuleInfo, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigureOutcome {
    /// First enablement: an external assignment was created and the config stored.
    Created,
    Updated,
    /// Detection stays off and nothing was stored before.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModuleSettingsUpdate {
    pub(crate) use_detection: bool,
    pub(crate) show_student_results: bool,
}

/// Per-module switches: whether detection is used, student visibility and the disclosure text.
#[derive(Clone, Copy)]
pub(crate) struct ModuleSettings<'a> {
    state: &'a AppState,
}

impl<'a> ModuleSettings<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// The module's config and host info when detection is switched on for it.
    ///
    /// A module the host no longer knows about counts as unused, even if a config row remains.
    pub(crate) async fn active_module(
        &self,
        course_module_id: i64,
    ) -> Result<Option<(ModuleConfig, ModuleInfo)>, DetectionError> {
        let Some(config) = self.state.store().get_module_config(course_module_id).await? else {
            return Ok(None);
        };
        if !config.use_detection {
            return Ok(None);
        }
        let Some(module) = self.state.host().module_info(course_module_id).await? else {
            tracing::debug!(course_module_id, "Module config refers to a module the host no longer has");
            return Ok(None);
        };
        Ok(Some((config, module)))
    }

    pub(crate) async fn detection_in_use(&self, course_module_id: i64) -> bool {
        match self.active_module(course_module_id).await {
            Ok(active) => active.is_some(),
            Err(err) => {
                tracing::warn!(course_module_id, error = %err, "Failed to check module detection usage");
                false
            }
        }
    }

    /// Applies a settings change coming from the host's module form.
    ///
    /// The first time a module is switched on, an assignment is created on the
    /// detection service on behalf of `actor`; if that fails nothing is stored.
    pub(crate) async fn configure_module(
        &self,
        course_module_id: i64,
        actor: &UserProfile,
        update: &ModuleSettingsUpdate,
    ) -> Result<ConfigureOutcome, DetectionError> {
        if !self.state.settings().detection().is_configured() {
            return Err(DetectionError::NotConfigured("detection is disabled or missing credentials"));
        }

        let module = self
            .state
            .host()
            .module_info(course_module_id)
            .await?
            .ok_or_else(|| DetectionError::NotFound(format!("course module {course_module_id}")))?;
        if !self.state.settings().detection().module_enabled(&module.module_type) {
            return Err(DetectionError::NotConfigured("detection is not enabled for this module type"));
        }

        let now = primitive_now_utc();
        let existing = self.state.store().get_module_config(course_module_id).await?;

        let config = match existing {
            Some(mut config) => {
                if config.use_detection == update.use_detection
                    && config.show_student_results == update.show_student_results
                {
                    return Ok(ConfigureOutcome::Unchanged);
                }
                config.use_detection = update.use_detection;
                config.show_student_results = update.show_student_results;
                config.updated_at = now;
                self.state.store().upsert_module_config(&config).await?;
                tracing::info!(
                    course_module_id,
                    use_detection = config.use_detection,
                    show_student_results = config.show_student_results,
                    "Module detection settings updated"
                );
                return Ok(ConfigureOutcome::Updated);
            }
            None if !update.use_detection => return Ok(ConfigureOutcome::Unchanged),
            None => {
                let email = actor.email.clone().unwrap_or_default();
                let assignment_id = self
                    .state
                    .detection()
                    .create_assignment(&actor.username, &email, actor.id)
                    .await
                    .map_err(|err| {
                        tracing::error!(
                            course_module_id,
                            user_id = actor.id,
                            error = %err,
                            "Failed to create detection assignment"
                        );
                        err
                    })?;

                ModuleConfig {
                    course_module_id,
                    use_detection: true,
                    show_student_results: update.show_student_results,
                    external_assignment_id: Some(assignment_id),
                    creator_email: actor.email.clone(),
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        self.state.store().upsert_module_config(&config).await?;
        tracing::info!(
            course_module_id,
            assignment_id = config.external_assignment_id.as_deref().unwrap_or_default(),
            "Detection enabled for module"
        );
        Ok(ConfigureOutcome::Created)
    }

    /// Text shown to students on the submission page of a module that uses detection.
    pub(crate) async fn disclosure(&self, course_module_id: i64) -> Option<String> {
        if !self.state.settings().detection().is_configured() {
            return None;
        }
        if !self.detection_in_use(course_module_id).await {
            return None;
        }
        let text = self.state.settings().detection().student_disclosure.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
