use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod event;
pub(crate) mod links;
pub(crate) mod module_config;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) detection_enabled: bool,
}
