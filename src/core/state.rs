use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::detection_client::DetectionApi;
use crate::services::host_platform::HostPlatform;
use crate::services::result_store::ResultStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn ResultStore>,
    detection: Arc<dyn DetectionApi>,
    host: Arc<dyn HostPlatform>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn ResultStore>,
        detection: Arc<dyn DetectionApi>,
        host: Arc<dyn HostPlatform>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, detection, host }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn ResultStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn detection(&self) -> &dyn DetectionApi {
        self.inner.detection.as_ref()
    }

    pub(crate) fn host(&self) -> &dyn HostPlatform {
        self.inner.host.as_ref()
    }
}
