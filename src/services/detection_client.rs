use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::core::metrics;
use crate::db::models::DetectionResult;
use crate::services::errors::DetectionError;

const API_KEY_HEADER: &str = "x-api-key";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Submission metadata sent alongside every file or text analysis request.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SubmissionMetadata {
    pub(crate) assignment_name: String,
    pub(crate) assignment_id: Option<String>,
    pub(crate) user_id: i64,
    pub(crate) user_name: String,
    pub(crate) user_email: String,
}

impl SubmissionMetadata {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("assignmentName", self.assignment_name.clone()),
            ("assignmentId", self.assignment_id.clone().unwrap_or_default()),
            ("userId", self.user_id.to_string()),
            ("userName", self.user_name.clone()),
            ("userEmail", self.user_email.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FileUpload {
    pub(crate) filename: String,
    pub(crate) mimetype: Option<String>,
    pub(crate) content: Vec<u8>,
}

/// Outbound operations against the detection service.
#[async_trait]
pub(crate) trait DetectionApi: Send + Sync {
    async fn submit_file(
        &self,
        file: &FileUpload,
        metadata: &SubmissionMetadata,
    ) -> Result<DetectionResult, DetectionError>;

    async fn submit_text(
        &self,
        text: &str,
        metadata: &SubmissionMetadata,
    ) -> Result<DetectionResult, DetectionError>;

    async fn create_assignment(
        &self,
        user_name: &str,
        user_email: &str,
        user_id: i64,
    ) -> Result<String, DetectionError>;

    async fn has_account(&self, user_email: &str) -> Result<bool, DetectionError>;
}

#[derive(Debug, Clone)]
pub(crate) struct DetectionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: Option<bool>,
    results: Option<SubmitResults>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SubmitResults {
    predicted_class: Option<String>,
    class_probability: Option<f64>,
    confidence_category: Option<String>,
    #[serde(rename = "scanId")]
    scan_id: Option<Value>,
    #[serde(rename = "scanUrl")]
    scan_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    success: Option<bool>,
    #[serde(rename = "hasAccount")]
    has_account: Option<bool>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    success: Option<bool>,
    data: Option<AssignmentData>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AssignmentData {
    #[serde(alias = "gptzero_assignment_id")]
    assignment_id: Option<Value>,
}

impl DetectionClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let detection = settings.detection();
        let timeout = Duration::from_secs(detection.timeout_seconds);
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .redirect(same_origin_redirects(detection.max_redirects))
            .http1_only()
            .build()
            .context("Failed to build detection HTTP client")?;

        Ok(Self {
            client,
            api_key: detection.api_key.clone(),
            base_url: detection.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, DetectionError> {
        if self.api_key.is_empty() {
            return Err(DetectionError::NotConfigured("missing detection API key"));
        }
        if self.base_url.is_empty() {
            return Err(DetectionError::NotConfigured("missing detection base URL"));
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    /// Sends the request and returns the decoded JSON body of a 2xx response.
    async fn send(&self, name: &'static str, request: RequestBuilder) -> Result<Value, DetectionError> {
        let timer = Instant::now();
        let outcome = self.send_inner(request).await;
        let label = match &outcome {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        metrics::record_detection_call(name, label, timer.elapsed());

        match &outcome {
            Ok(_) => tracing::debug!(endpoint = name, "Detection response received"),
            Err(err) => tracing::warn!(endpoint = name, error = %err, "Detection call failed"),
        }

        outcome
    }

    async fn send_inner(&self, request: RequestBuilder) -> Result<Value, DetectionError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DetectionError::Transport(format!("request timed out: {err}"))
                } else {
                    DetectionError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        let raw_body = response
            .text()
            .await
            .map_err(|err| DetectionError::Transport(format!("failed to read body: {err}")))?;

        if !status.is_success() {
            return Err(DetectionError::Transport(format!(
                "unexpected status {}: {}",
                status,
                truncate(&raw_body, 200)
            )));
        }

        serde_json::from_str::<Value>(&raw_body).map_err(|err| {
            DetectionError::Transport(format!(
                "non-JSON body (status {}): {}: {}",
                status,
                err,
                truncate(&raw_body, 200)
            ))
        })
    }

    async fn submit(&self, form: Form) -> Result<DetectionResult, DetectionError> {
        let url = self.endpoint("/submit")?;
        let body = self.send("submit", self.client.post(url).multipart(form)).await?;
        parse_submit_response(body)
    }
}

#[async_trait]
impl DetectionApi for DetectionClient {
    async fn submit_file(
        &self,
        file: &FileUpload,
        metadata: &SubmissionMetadata,
    ) -> Result<DetectionResult, DetectionError> {
        let mimetype = file.mimetype.as_deref().unwrap_or(DEFAULT_MIME_TYPE);
        let part = Part::bytes(file.content.clone()).file_name(base_name(&file.filename));
        let part = match part.mime_str(mimetype) {
            Ok(part) => part,
            Err(_) => Part::bytes(file.content.clone())
                .file_name(base_name(&file.filename))
                .mime_str(DEFAULT_MIME_TYPE)
                .map_err(|err| DetectionError::Transport(err.to_string()))?,
        };

        let form = with_metadata(Form::new().part("file", part), metadata);
        self.submit(form).await
    }

    async fn submit_text(
        &self,
        text: &str,
        metadata: &SubmissionMetadata,
    ) -> Result<DetectionResult, DetectionError> {
        let form = with_metadata(Form::new().text("text", text.to_string()), metadata);
        self.submit(form).await
    }

    async fn create_assignment(
        &self,
        user_name: &str,
        user_email: &str,
        user_id: i64,
    ) -> Result<String, DetectionError> {
        let url = self.endpoint("/deep-linking")?;
        let payload = json!({
            "userName": user_name,
            "userEmail": user_email,
            "userId": user_id,
        });
        let body = self.send("deep_linking", self.client.post(url).json(&payload)).await?;
        parse_assignment_response(body)
    }

    async fn has_account(&self, user_email: &str) -> Result<bool, DetectionError> {
        let url = self.endpoint("/launch")?;
        let payload = json!({ "userEmail": user_email });
        let body = self.send("launch", self.client.post(url).json(&payload)).await?;
        parse_account_response(body)
    }
}

/// Follows at most `max_redirects` hops and never leaves the original origin,
/// since the API key header is sent on every hop.
fn same_origin_redirects(max_redirects: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error("too many redirects");
        }
        let same_origin = attempt
            .previous()
            .first()
            .is_some_and(|origin| origin.origin() == attempt.url().origin());
        if same_origin {
            attempt.follow()
        } else {
            tracing::warn!(location = %attempt.url(), "Refusing cross-origin redirect from detection service");
            attempt.stop()
        }
    })
}

fn with_metadata(form: Form, metadata: &SubmissionMetadata) -> Form {
    metadata.fields().into_iter().fold(form, |form, (name, value)| form.text(name, value))
}

fn parse_submit_response(body: Value) -> Result<DetectionResult, DetectionError> {
    let parsed: SubmitResponse = serde_json::from_value(body)
        .map_err(|err| DetectionError::Transport(format!("unexpected submit response: {err}")))?;

    if let Some(message) = remote_error(parsed.success, parsed.error.as_ref()) {
        return Err(DetectionError::Remote(message));
    }

    let results = parsed
        .results
        .ok_or_else(|| DetectionError::Transport("submit response missing results".to_string()))?;

    let predicted_class = results
        .predicted_class
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| DetectionError::Transport("submit response missing predicted_class".to_string()))?;

    let class_probability = results.class_probability.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&class_probability) {
        return Err(DetectionError::Transport(format!(
            "class_probability out of range: {class_probability}"
        )));
    }

    Ok(DetectionResult {
        predicted_class,
        class_probability,
        confidence_category: results.confidence_category,
        scan_id: results.scan_id.as_ref().and_then(value_to_string),
        scan_url: results.scan_url.filter(|value| !value.trim().is_empty()),
    })
}

fn parse_account_response(body: Value) -> Result<bool, DetectionError> {
    let parsed: AccountResponse = serde_json::from_value(body)
        .map_err(|err| DetectionError::Transport(format!("unexpected launch response: {err}")))?;

    if let Some(message) = remote_error(parsed.success, parsed.error.as_ref()) {
        return Err(DetectionError::Remote(message));
    }

    parsed
        .has_account
        .ok_or_else(|| DetectionError::Transport("launch response missing hasAccount".to_string()))
}

fn parse_assignment_response(body: Value) -> Result<String, DetectionError> {
    let parsed: AssignmentResponse = serde_json::from_value(body).map_err(|err| {
        DetectionError::Transport(format!("unexpected deep-linking response: {err}"))
    })?;

    if let Some(message) = remote_error(parsed.success, parsed.error.as_ref()) {
        return Err(DetectionError::Remote(message));
    }

    parsed
        .data
        .and_then(|data| data.assignment_id)
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| DetectionError::Remote("assignment creation returned no id".to_string()))
}

fn remote_error(success: Option<bool>, error: Option<&Value>) -> Option<String> {
    if let Some(error) = error.filter(|value| !value.is_null()) {
        return Some(value_to_string(error).unwrap_or_else(|| error.to_string()));
    }
    if success == Some(false) {
        return Some("success=false".to_string());
    }
    None
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .or_else(|| Some(value.to_string())),
        _ => None,
    }
}

fn base_name(filename: &str) -> String {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename).to_string()
}

fn truncate(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
