use serde::{Deserialize, Serialize};

/// Categorical verdict returned by the detection service.
///
/// Stored as the raw string the service sent; anything outside the known set
/// maps to `Unknown` when read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PredictedClass {
    Ai,
    Human,
    Mixed,
    Unknown,
}

impl PredictedClass {
    pub(crate) fn from_raw(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ai" => PredictedClass::Ai,
            "human" => PredictedClass::Human,
            "mixed" => PredictedClass::Mixed,
            _ => PredictedClass::Unknown,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            PredictedClass::Ai => "AI",
            PredictedClass::Human => "Human",
            PredictedClass::Mixed => "Mixed",
            PredictedClass::Unknown => "Unknown",
        }
    }

    /// Badge background and hover colours.
    pub(crate) fn colors(self) -> (&'static str, &'static str) {
        match self {
            PredictedClass::Human => ("#8AD4BA", "#39B58A"),
            PredictedClass::Mixed => ("#E9D2FF", "#CDA3F5"),
            PredictedClass::Ai | PredictedClass::Unknown => ("#FEBD69", "#E19F4A"),
        }
    }
}
