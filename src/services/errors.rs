use thiserror::Error;

/// Failures the detection integration can run into.
///
/// None of these reach the learner: the submission pipeline downgrades every
/// variant to a logged diagnostic and a "no result yet" record.
#[derive(Debug, Error)]
pub(crate) enum DetectionError {
    /// Network, timeout, non-2xx status or an unparseable body.
    #[error("detection service transport failure: {0}")]
    Transport(String),
    /// Well-formed error payload returned by the detection service.
    #[error("detection service returned an error: {0}")]
    Remote(String),
    #[error("detection is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DetectionError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            DetectionError::Transport(_) => "transport",
            DetectionError::Remote(_) => "remote",
            DetectionError::NotConfigured(_) => "not_configured",
            DetectionError::NotFound(_) => "not_found",
            DetectionError::Database(_) => "database",
        }
    }
}
