pub(crate) mod account_notice;
pub(crate) mod content_identifier;
pub(crate) mod detection_client;
pub(crate) mod errors;
pub(crate) mod host_platform;
pub(crate) mod module_settings;
pub(crate) mod result_presenter;
pub(crate) mod result_store;
pub(crate) mod submission_pipeline;
