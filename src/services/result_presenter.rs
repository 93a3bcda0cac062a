use serde::Serialize;

use crate::core::state::AppState;
use crate::db::models::{RecordKey, SubmissionRecord};
use crate::db::types::PredictedClass;
use crate::services::errors::DetectionError;
use crate::services::host_platform::ModuleInfo;
use crate::services::module_settings::ModuleSettings;
use crate::services::submission_pipeline::SubmissionPipeline;

/// What to show next to a submission in the host's grading views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DisplayFragment {
    Empty,
    Pending,
    Inline { class: PredictedClass, percent: u8 },
    Link { class: PredictedClass, percent: u8, scan_url: String },
}

impl DisplayFragment {
    fn from_record(record: &SubmissionRecord) -> Self {
        let Some((class, probability)) = record.classification() else {
            return DisplayFragment::Pending;
        };
        let percent = probability_percent(probability);
        match record.scan_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => DisplayFragment::Link { class, percent, scan_url: url.to_string() },
            None => DisplayFragment::Inline { class, percent },
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, DisplayFragment::Empty)
    }

    pub(crate) fn text(&self) -> String {
        match self {
            DisplayFragment::Empty => String::new(),
            DisplayFragment::Pending => "Pending".to_string(),
            DisplayFragment::Inline { class, percent } => format!("{}: {percent}%", class.label()),
            DisplayFragment::Link { class, percent, .. } => format!("{} - {percent}%", class.label()),
        }
    }

    pub(crate) fn to_html(&self, logo_url: Option<&str>) -> String {
        match self {
            DisplayFragment::Empty => String::new(),
            DisplayFragment::Pending | DisplayFragment::Inline { .. } => {
                format!("<br>{}", escape_html(&self.text()))
            }
            DisplayFragment::Link { class, scan_url, .. } => {
                let (background, hover) = class.colors();
                let logo = logo_url
                    .map(|url| {
                        format!(
                            "<img src=\"{}\" alt=\"AI detection\" style=\"height: 20px;\">",
                            escape_html(url)
                        )
                    })
                    .unwrap_or_default();
                format!(
                    "<br><a href=\"{href}\" target=\"_blank\" rel=\"noopener\" \
                     style=\"text-decoration: none; display: flex; align-items: center; gap: 10px; margin-top: 6px\">\
                     {logo}<div class=\"ai-detection-badge\" data-hover-color=\"{hover}\" \
                     style=\"display: flex; width: 110px; height: 25px; justify-content: center; align-items: center; \
                     background: {background}; border-radius: 5px; font-size: 13px; font-weight: 700; color: #000;\">\
                     {text}</div></a>",
                    href = escape_html(scan_url),
                    text = escape_html(&self.text()),
                )
            }
        }
    }
}

/// `round(probability * 100)`, clamped to 0..=100.
pub(crate) fn probability_percent(probability: f64) -> u8 {
    if !probability.is_finite() {
        return 0;
    }
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Clone, Copy)]
pub(crate) struct ResultPresenter<'a> {
    state: &'a AppState,
}

impl<'a> ResultPresenter<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Never fails: lookup problems are logged and rendered as nothing.
    pub(crate) async fn render(&self, key: &RecordKey, viewer_can_see_report: bool) -> DisplayFragment {
        match self.try_render(key, viewer_can_see_report).await {
            Ok(fragment) => fragment,
            Err(err) => {
                tracing::warn!(
                    course_module_id = key.course_module_id,
                    user_id = key.user_id,
                    identifier = %key.identifier,
                    error = %err,
                    "Failed to render detection result"
                );
                DisplayFragment::Empty
            }
        }
    }

    async fn try_render(
        &self,
        key: &RecordKey,
        viewer_can_see_report: bool,
    ) -> Result<DisplayFragment, DetectionError> {
        if !self.state.settings().detection().is_configured() {
            return Ok(DisplayFragment::Empty);
        }

        let Some((config, module)) =
            ModuleSettings::new(self.state).active_module(key.course_module_id).await?
        else {
            return Ok(DisplayFragment::Empty);
        };
        if !viewer_can_see_report && !config.show_student_results {
            return Ok(DisplayFragment::Empty);
        }

        let mut record = self.state.store().find_record(key).await?;
        if record.is_none() && module.team_submission {
            record = self.find_team_record(&module, key).await?;
        }
        Ok(record.as_ref().map(DisplayFragment::from_record).unwrap_or(DisplayFragment::Empty))
    }

    /// Team submissions are stored under the attributed group member, not the viewer's row.
    async fn find_team_record(
        &self,
        module: &ModuleInfo,
        key: &RecordKey,
    ) -> Result<Option<SubmissionRecord>, DetectionError> {
        let attributed_user_id =
            SubmissionPipeline::new(self.state).resolve_group_attribution(module, key.user_id).await?;
        if attributed_user_id == key.user_id {
            return Ok(None);
        }

        let team_key = RecordKey { user_id: attributed_user_id, ..key.clone() };
        Ok(self.state.store().find_record(&team_key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::DetectionResult;
    use crate::test_support::{self, FakeDetection, FakeHost, MemoryResultStore};

    fn key(identifier: &str) -> RecordKey {
        RecordKey { course_module_id: 10, user_id: 5, identifier: identifier.to_string() }
    }

    fn result(class: &str, probability: f64, scan_url: Option<&str>) -> DetectionResult {
        DetectionResult {
            predicted_class: class.to_string(),
            class_probability: probability,
            confidence_category: Some("high".to_string()),
            scan_id: Some("scan-9".to_string()),
            scan_url: scan_url.map(ToString::to_string),
        }
    }

    fn presenter_store(show_student_results: bool) -> MemoryResultStore {
        let store = MemoryResultStore::new();
        store.put_config(test_support::module_config(10, true, show_student_results));
        store
    }

    #[test]
    fn probability_rounds_to_whole_percent() {
        assert_eq!(probability_percent(0.873), 87);
        assert_eq!(probability_percent(1.0), 100);
        assert_eq!(probability_percent(0.005), 1);
        assert_eq!(probability_percent(0.0), 0);
        assert_eq!(probability_percent(f64::NAN), 0);
    }

    #[test]
    fn fragment_text_matches_display_forms() {
        let inline = DisplayFragment::Inline { class: PredictedClass::Human, percent: 87 };
        let link = DisplayFragment::Link {
            class: PredictedClass::Ai,
            percent: 100,
            scan_url: "https://detector.example/scans/1".to_string(),
        };
        assert_eq!(inline.text(), "Human: 87%");
        assert_eq!(link.text(), "AI - 100%");
        assert_eq!(DisplayFragment::Pending.text(), "Pending");
        assert_eq!(DisplayFragment::Empty.to_html(None), "");
    }

    #[test]
    fn unknown_class_uses_default_colours() {
        let fragment = DisplayFragment::Link {
            class: PredictedClass::from_raw("paraphrased"),
            percent: 40,
            scan_url: "https://detector.example/scans/2".to_string(),
        };
        let html = fragment.to_html(None);
        assert!(html.contains("Unknown - 40%"));
        assert!(html.contains("#FEBD69"));
        assert!(html.contains("#E19F4A"));
    }

    #[test]
    fn link_html_escapes_values() {
        let fragment = DisplayFragment::Link {
            class: PredictedClass::Mixed,
            percent: 55,
            scan_url: "https://detector.example/?a=1&b=\"x\"".to_string(),
        };
        let html = fragment.to_html(Some("https://cdn.example/logo.png?v=<1>"));
        assert!(html.contains("href=\"https://detector.example/?a=1&amp;b=&quot;x&quot;\""));
        assert!(html.contains("logo.png?v=&lt;1&gt;"));
        assert!(html.contains("#E9D2FF"));
    }

    #[tokio::test]
    async fn classified_record_with_scan_url_renders_link() {
        let store = presenter_store(false);
        store.seed_record(10, 5, "abc", Some(result("human", 0.873, Some("https://detector.example/s/1"))));
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());

        let fragment = ResultPresenter::new(&state).render(&key("abc"), true).await;

        assert_eq!(
            fragment,
            DisplayFragment::Link {
                class: PredictedClass::Human,
                percent: 87,
                scan_url: "https://detector.example/s/1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn classified_record_without_scan_url_renders_inline() {
        let store = presenter_store(false);
        store.seed_record(10, 5, "abc", Some(result("ai", 1.0, None)));
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());

        let fragment = ResultPresenter::new(&state).render(&key("abc"), true).await;

        assert_eq!(fragment.text(), "AI: 100%");
        assert_eq!(fragment.to_html(None), "<br>AI: 100%");
    }

    #[tokio::test]
    async fn record_without_classification_is_pending() {
        let store = presenter_store(false);
        store.seed_record(10, 5, "abc", None);
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());

        let fragment = ResultPresenter::new(&state).render(&key("abc"), true).await;

        assert_eq!(fragment, DisplayFragment::Pending);
    }

    #[tokio::test]
    async fn missing_record_renders_nothing() {
        let state = test_support::state_with(presenter_store(false), FakeDetection::new(), FakeHost::course());

        let fragment = ResultPresenter::new(&state).render(&key("nothing"), true).await;

        assert!(fragment.is_empty());
    }

    #[tokio::test]
    async fn students_see_results_only_when_module_allows() {
        let hidden = presenter_store(false);
        hidden.seed_record(10, 5, "abc", Some(result("ai", 0.9, None)));
        let state = test_support::state_with(hidden, FakeDetection::new(), FakeHost::course());
        assert!(ResultPresenter::new(&state).render(&key("abc"), false).await.is_empty());

        let shown = presenter_store(true);
        shown.seed_record(10, 5, "abc", Some(result("ai", 0.9, None)));
        let state = test_support::state_with(shown, FakeDetection::new(), FakeHost::course());
        assert_eq!(ResultPresenter::new(&state).render(&key("abc"), false).await.text(), "AI: 90%");
    }

    #[tokio::test]
    async fn team_result_renders_for_every_group_member() {
        let store = MemoryResultStore::new();
        store.put_config(test_support::module_config(20, true, false));
        store.seed_record(20, 6, "c0ffee01", Some(result("ai", 0.9, None)));
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());
        let presenter = ResultPresenter::new(&state);

        for user_id in [5, 6, 7] {
            let key = RecordKey { course_module_id: 20, user_id, identifier: "c0ffee01".to_string() };
            assert_eq!(presenter.render(&key, true).await.text(), "AI: 90%", "user {user_id}");
        }
    }

    #[tokio::test]
    async fn team_lookup_ignores_other_groups() {
        let store = MemoryResultStore::new();
        store.put_config(test_support::module_config(20, true, false));
        store.seed_record(20, 6, "c0ffee01", Some(result("ai", 0.9, None)));
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());

        // jdoe belongs to no group, so the team row is not theirs to see.
        let key = RecordKey { course_module_id: 20, user_id: 2, identifier: "c0ffee01".to_string() };
        assert!(ResultPresenter::new(&state).render(&key, true).await.is_empty());
    }

    #[tokio::test]
    async fn modules_without_detection_render_nothing() {
        let store = MemoryResultStore::new();
        store.put_config(test_support::module_config(10, false, true));
        store.seed_record(10, 5, "abc", Some(result("ai", 0.9, None)));
        let state = test_support::state_with(store, FakeDetection::new(), FakeHost::course());

        assert!(ResultPresenter::new(&state).render(&key("abc"), true).await.is_empty());
    }
}
