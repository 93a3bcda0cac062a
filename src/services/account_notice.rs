use crate::core::context::RequestContext;
use crate::core::state::AppState;
use crate::services::host_platform::UserProfile;

/// Reminds graders who have no detection-service account yet that one is needed for full reports.
#[derive(Clone, Copy)]
pub(crate) struct AccountNotice<'a> {
    state: &'a AppState,
}

impl<'a> AccountNotice<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// At most one account lookup per request context, whatever the outcome.
    pub(crate) async fn grading_view_notice(
        &self,
        context: &mut RequestContext,
        viewer: &UserProfile,
        viewer_can_grade: bool,
    ) -> Option<String> {
        if context.account_checked() || !viewer_can_grade {
            return None;
        }
        if !self.state.settings().detection().is_configured() {
            return None;
        }

        let Some(email) = viewer.email.as_deref().map(str::trim).filter(|email| !email.is_empty())
        else {
            tracing::debug!(user_id = viewer.id, "Viewer has no email; skipping account check");
            return None;
        };

        context.mark_account_checked();
        match self.state.detection().has_account(email).await {
            Ok(true) => None,
            Ok(false) => {
                tracing::info!(
                    user_id = viewer.id,
                    request_id = %context.request_id(),
                    "Grader has no detection account"
                );
                Some(format!(
                    "It looks like you have not yet created an AI detection account. \
                     An account is required to see in-depth results in the detection dashboard. \
                     An invitation was sent to {email} during assignment creation."
                ))
            }
            Err(err) => {
                tracing::warn!(user_id = viewer.id, error = %err, "Account check failed");
                None
            }
        }
    }
}
