use uuid::Uuid;

/// State scoped to a single host request.
///
/// Replaces process-wide "already done this request" flags: handlers create one
/// context per incoming call and thread it through every service they invoke.
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    request_id: Uuid,
    account_checked: bool,
}

impl RequestContext {
    pub(crate) fn new() -> Self {
        Self { request_id: Uuid::new_v4(), account_checked: false }
    }

    pub(crate) fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Whether the viewer's detection-service account was already checked in this request.
    pub(crate) fn account_checked(&self) -> bool {
        self.account_checked
    }

    pub(crate) fn mark_account_checked(&mut self) {
        self.account_checked = true;
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
