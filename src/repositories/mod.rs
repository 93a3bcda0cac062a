pub(crate) mod detection_records;
pub(crate) mod host_directory;
pub(crate) mod module_configs;
