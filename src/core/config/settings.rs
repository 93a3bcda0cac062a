use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_string_list, parse_u16,
    parse_u64, parse_usize,
};
use super::types::{
    ConfigError, DatabaseSettings, DetectionSettings, HostApiSettings, RuntimeSettings,
    ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

const DEFAULT_STUDENT_DISCLOSURE: &str =
    "All files uploaded will be submitted to an AI detection service";
const MAX_REDIRECT_LIMIT: usize = 10;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("BRIDGE_HOST", "0.0.0.0");
        let port = env_or_default("BRIDGE_PORT", "8000");

        let environment =
            parse_environment(env_optional("BRIDGE_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("BRIDGE_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "detection_bridge");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "detection_bridge");
        let database_url = env_optional("DATABASE_URL");

        let detection_enabled =
            env_optional("DETECTION_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let detection_api_key = env_or_default("DETECTION_API_KEY", "");
        let detection_base_url =
            env_or_default("DETECTION_BASE_URL", "").trim_end_matches('/').to_string();
        let detection_timeout_seconds = parse_u64(
            "DETECTION_TIMEOUT_SECONDS",
            env_or_default("DETECTION_TIMEOUT_SECONDS", "30"),
        )?;
        let detection_max_redirects = parse_usize(
            "DETECTION_MAX_REDIRECTS",
            env_or_default("DETECTION_MAX_REDIRECTS", "10"),
        )?;
        let detection_enabled_modules =
            parse_string_list(env_optional("DETECTION_ENABLED_MODULES"), &["assign"]);
        let student_disclosure =
            env_or_default("DETECTION_STUDENT_DISCLOSURE", DEFAULT_STUDENT_DISCLOSURE);
        let logo_url = env_optional("DETECTION_LOGO_URL");

        let host_api_token = env_or_default("HOST_API_TOKEN", "");

        let log_level = env_or_default("BRIDGE_LOG_LEVEL", "info");
        let json = env_optional("BRIDGE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            detection: DetectionSettings {
                enabled: detection_enabled,
                api_key: detection_api_key,
                base_url: detection_base_url,
                timeout_seconds: detection_timeout_seconds,
                max_redirects: detection_max_redirects,
                enabled_modules: detection_enabled_modules,
                student_disclosure,
                logo_url,
            },
            host_api: HostApiSettings { token: host_api_token },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn detection(&self) -> &DetectionSettings {
        &self.detection
    }

    pub(crate) fn host_api(&self) -> &HostApiSettings {
        &self.host_api
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DETECTION_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }

        if self.detection.max_redirects > MAX_REDIRECT_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "DETECTION_MAX_REDIRECTS",
                value: self.detection.max_redirects.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.detection.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("DETECTION_API_KEY"));
        }

        if self.detection.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("DETECTION_BASE_URL"));
        }

        if self.host_api.token.is_empty() {
            return Err(ConfigError::MissingSecret("HOST_API_TOKEN"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl DetectionSettings {
    /// Detection runs only when switched on and both the credential and endpoint are known.
    pub(crate) fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    pub(crate) fn module_enabled(&self, module_type: &str) -> bool {
        let module_type = module_type.trim().to_ascii_lowercase();
        let module_type = module_type.strip_prefix("mod_").unwrap_or(&module_type);
        self.enabled_modules.iter().any(|enabled| enabled == module_type)
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}

#[cfg(test)]
impl Settings {
    pub(crate) fn for_tests() -> Self {
        use super::types::Environment;

        Self {
            server: ServerSettings {
                host: ServerHost("127.0.0.1".to_string()),
                port: ServerPort(8000),
            },
            runtime: RuntimeSettings { environment: Environment::Test, strict_config: false },
            database: DatabaseSettings {
                postgres_server: "localhost".to_string(),
                postgres_port: 5432,
                postgres_user: "detection_bridge_test".to_string(),
                postgres_password: "detection_bridge_test".to_string(),
                postgres_db: "detection_bridge_test".to_string(),
                database_url: None,
            },
            detection: DetectionSettings {
                enabled: true,
                api_key: "test-api-key".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_seconds: 30,
                max_redirects: 10,
                enabled_modules: vec!["assign".to_string(), "forum".to_string()],
                student_disclosure: DEFAULT_STUDENT_DISCLOSURE.to_string(),
                logo_url: None,
            },
            host_api: HostApiSettings { token: "test-host-token".to_string() },
            telemetry: TelemetrySettings {
                log_level: "debug".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }

    pub(crate) fn detection_mut(&mut self) -> &mut DetectionSettings {
        &mut self.detection
    }

    pub(crate) fn telemetry_mut(&mut self) -> &mut TelemetrySettings {
        &mut self.telemetry
    }
}
