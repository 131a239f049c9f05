use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub nlu: NluConfig,
    pub server: ServerConfig,
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    pub project_id: String,
    pub access_token: SecretString,
    pub base_url: String,
    pub language: String,
    pub time_zone: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub session_id: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    pub base_url: Option<String>,
    pub language: Option<String>,
    pub time_zone: Option<String>,
    pub port: Option<u16>,
    pub console_enabled: Option<bool>,
    pub session_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nlu: NluConfig {
                project_id: String::new(),
                access_token: String::new().into(),
                base_url: "https://dialogflow.googleapis.com".to_string(),
                language: "en".to_string(),
                time_zone: "UTC".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5000 },
            console: ConsoleConfig { enabled: true, session_id: "console".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("parley.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(nlu) = patch.nlu {
            if let Some(project_id) = nlu.project_id {
                self.nlu.project_id = project_id;
            }
            if let Some(access_token_value) = nlu.access_token {
                self.nlu.access_token = secret_value(access_token_value);
            }
            if let Some(base_url) = nlu.base_url {
                self.nlu.base_url = base_url;
            }
            if let Some(language) = nlu.language {
                self.nlu.language = language;
            }
            if let Some(time_zone) = nlu.time_zone {
                self.nlu.time_zone = time_zone;
            }
            if let Some(timeout_secs) = nlu.timeout_secs {
                self.nlu.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(console) = patch.console {
            if let Some(enabled) = console.enabled {
                self.console.enabled = enabled;
            }
            if let Some(session_id) = console.session_id {
                self.console.session_id = session_id;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PARLEY_NLU_PROJECT_ID") {
            self.nlu.project_id = value;
        }
        if let Some(value) = read_env("PARLEY_NLU_ACCESS_TOKEN") {
            self.nlu.access_token = secret_value(value);
        }
        if let Some(value) = read_env("PARLEY_NLU_BASE_URL") {
            self.nlu.base_url = value;
        }
        if let Some(value) = read_env("PARLEY_NLU_LANGUAGE") {
            self.nlu.language = value;
        }
        if let Some(value) = read_env("PARLEY_NLU_TIME_ZONE") {
            self.nlu.time_zone = value;
        }
        if let Some(value) = read_env("PARLEY_NLU_TIMEOUT_SECS") {
            self.nlu.timeout_secs = parse_u64("PARLEY_NLU_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PARLEY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PARLEY_SERVER_PORT") {
            self.server.port = parse_u16("PARLEY_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("PARLEY_CONSOLE_ENABLED") {
            self.console.enabled = parse_bool("PARLEY_CONSOLE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PARLEY_CONSOLE_SESSION_ID") {
            self.console.session_id = value;
        }

        let log_level = read_env("PARLEY_LOGGING_LEVEL").or_else(|| read_env("PARLEY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PARLEY_LOGGING_FORMAT").or_else(|| read_env("PARLEY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(project_id) = overrides.project_id {
            self.nlu.project_id = project_id;
        }
        if let Some(access_token) = overrides.access_token {
            self.nlu.access_token = secret_value(access_token);
        }
        if let Some(base_url) = overrides.base_url {
            self.nlu.base_url = base_url;
        }
        if let Some(language) = overrides.language {
            self.nlu.language = language;
        }
        if let Some(time_zone) = overrides.time_zone {
            self.nlu.time_zone = time_zone;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(console_enabled) = overrides.console_enabled {
            self.console.enabled = console_enabled;
        }
        if let Some(session_id) = overrides.session_id {
            self.console.session_id = session_id;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nlu(&self.nlu)?;
        validate_server(&self.server)?;
        validate_console(&self.console)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("parley.toml"), PathBuf::from("config/parley.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_nlu(nlu: &NluConfig) -> Result<(), ConfigError> {
    if nlu.project_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "nlu.project_id is required. Use the agent's cloud project identifier".to_string(),
        ));
    }

    if nlu.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "nlu.access_token is required to authenticate detectIntent calls".to_string(),
        ));
    }

    if !nlu.base_url.starts_with("http://") && !nlu.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "nlu.base_url must start with http:// or https://".to_string(),
        ));
    }

    if nlu.language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "nlu.language must be a language code such as `en`".to_string(),
        ));
    }

    if nlu.time_zone.trim().is_empty() {
        return Err(ConfigError::Validation(
            "nlu.time_zone must be an IANA zone name such as `UTC`".to_string(),
        ));
    }

    if nlu.timeout_secs == 0 || nlu.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "nlu.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
        ));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_console(console: &ConsoleConfig) -> Result<(), ConfigError> {
    if console.enabled && console.session_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "console.session_id must not be empty when the console is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    nlu: Option<NluPatch>,
    server: Option<ServerPatch>,
    console: Option<ConsolePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    project_id: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
    language: Option<String>,
    time_zone: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct ConsolePatch {
    enabled: Option<bool>,
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_NLU_ACCESS_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("parley.toml");
            fs::write(
                &path,
                r#"
[nlu]
project_id = "coffee-agent"
access_token = "${TEST_NLU_ACCESS_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.nlu.access_token.expose_secret() == "token-from-env",
                "access token should be loaded from environment",
            )?;
            ensure(
                config.nlu.project_id == "coffee-agent",
                "project id should be loaded from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_NLU_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARLEY_NLU_PROJECT_ID", "coffee-agent");
        env::set_var("PARLEY_NLU_ACCESS_TOKEN", "token-test");
        env::set_var("PARLEY_LOG_LEVEL", "warn");
        env::set_var("PARLEY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "PARLEY_NLU_PROJECT_ID",
            "PARLEY_NLU_ACCESS_TOKEN",
            "PARLEY_LOG_LEVEL",
            "PARLEY_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARLEY_NLU_PROJECT_ID", "project-from-env");
        env::set_var("PARLEY_NLU_ACCESS_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("parley.toml");
            fs::write(
                &path,
                r#"
[nlu]
project_id = "project-from-file"
access_token = "token-from-file"
language = "es"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    language: Some("fr".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.nlu.language == "fr", "override language should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.nlu.project_id == "project-from-env",
                "env project id should win over file and defaults",
            )?;
            ensure(
                config.nlu.access_token.expose_secret() == "token-from-env",
                "env access token should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["PARLEY_NLU_PROJECT_ID", "PARLEY_NLU_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARLEY_NLU_ACCESS_TOKEN", "token-test");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("nlu.project_id")
            );
            ensure(has_message, "validation failure should mention nlu.project_id")
        })();

        clear_vars(&["PARLEY_NLU_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn invalid_port_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARLEY_NLU_PROJECT_ID", "coffee-agent");
        env::set_var("PARLEY_NLU_ACCESS_TOKEN", "token-test");
        env::set_var("PARLEY_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "PARLEY_SERVER_PORT"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["PARLEY_NLU_PROJECT_ID", "PARLEY_NLU_ACCESS_TOKEN", "PARLEY_SERVER_PORT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARLEY_NLU_PROJECT_ID", "coffee-agent");
        env::set_var("PARLEY_NLU_ACCESS_TOKEN", "token-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("token-secret-value"),
                "debug output should not contain the access token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["PARLEY_NLU_PROJECT_ID", "PARLEY_NLU_ACCESS_TOKEN"]);
        result
    }
}
