use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub use crate::errors::ConfigError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google: GoogleConfig,
    pub catalog: CatalogConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub directory_base_url: String,
    pub gmail_base_url: String,
    pub customer: String,
    pub timeout_secs: u64,
    pub access_token: Option<SecretString>,
    pub token_command: Option<String>,
    pub gmail_access_token: Option<SecretString>,
    pub gmail_token_command: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
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
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub access_token: Option<String>,
    pub gmail_access_token: Option<String>,
    pub directory_base_url: Option<String>,
    pub gmail_base_url: Option<String>,
    pub llm_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

/// Where a Google API call gets its bearer token from.
#[derive(Clone, Debug)]
pub enum TokenSourceConfig {
    Static(SecretString),
    Command(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google: GoogleConfig {
                directory_base_url: "https://admin.googleapis.com".to_string(),
                gmail_base_url: "https://gmail.googleapis.com".to_string(),
                customer: "my_customer".to_string(),
                timeout_secs: 30,
                access_token: None,
                token_command: None,
                gmail_access_token: None,
                gmail_token_command: None,
            },
            catalog: CatalogConfig::default(),
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
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

impl GoogleConfig {
    /// Token source for Directory API calls.
    pub fn directory_token(&self) -> Option<TokenSourceConfig> {
        token_source(self.access_token.as_ref(), self.token_command.as_deref())
    }

    /// Token source for Gmail settings calls; falls back to the directory
    /// token when no mailbox-specific token is configured.
    pub fn gmail_token(&self) -> Option<TokenSourceConfig> {
        self.dedicated_gmail_token().or_else(|| self.directory_token())
    }

    /// Gmail token source only when one is configured separately.
    pub fn dedicated_gmail_token(&self) -> Option<TokenSourceConfig> {
        token_source(self.gmail_access_token.as_ref(), self.gmail_token_command.as_deref())
    }

    pub fn require_token_sources(&self) -> Result<(), ConfigError> {
        if self.directory_token().is_none() {
            return Err(ConfigError::Validation(
                "google.access_token or google.token_command is required to reach the \
                 Directory and Gmail APIs"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn token_source(
    token: Option<&SecretString>,
    command: Option<&str>,
) -> Option<TokenSourceConfig> {
    if let Some(token) = token.filter(|token| !token.expose_secret().trim().is_empty()) {
        return Some(TokenSourceConfig::Static(token.clone()));
    }
    command
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(|command| TokenSourceConfig::Command(command.to_string()))
}

impl LlmConfig {
    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.api_key.as_ref().filter(|key| !key.expose_secret().trim().is_empty()).ok_or_else(|| {
            ConfigError::Validation("llm.api_key is required for the openai provider".to_string())
        })
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("aliasync.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(google) = patch.google {
            if let Some(directory_base_url) = google.directory_base_url {
                self.google.directory_base_url = directory_base_url;
            }
            if let Some(gmail_base_url) = google.gmail_base_url {
                self.google.gmail_base_url = gmail_base_url;
            }
            if let Some(customer) = google.customer {
                self.google.customer = customer;
            }
            if let Some(timeout_secs) = google.timeout_secs {
                self.google.timeout_secs = timeout_secs;
            }
            if let Some(access_token) = google.access_token {
                self.google.access_token = Some(secret_value(access_token));
            }
            if let Some(token_command) = google.token_command {
                self.google.token_command = Some(token_command);
            }
            if let Some(gmail_access_token) = google.gmail_access_token {
                self.google.gmail_access_token = Some(secret_value(gmail_access_token));
            }
            if let Some(gmail_token_command) = google.gmail_token_command {
                self.google.gmail_token_command = Some(gmail_token_command);
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
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
        if let Some(value) = read_env("ALIASYNC_GOOGLE_DIRECTORY_BASE_URL") {
            self.google.directory_base_url = value;
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_GMAIL_BASE_URL") {
            self.google.gmail_base_url = value;
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_CUSTOMER") {
            self.google.customer = value;
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_TIMEOUT_SECS") {
            self.google.timeout_secs = parse_u64("ALIASYNC_GOOGLE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_ACCESS_TOKEN") {
            self.google.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_TOKEN_COMMAND") {
            self.google.token_command = Some(value);
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_GMAIL_ACCESS_TOKEN") {
            self.google.gmail_access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ALIASYNC_GOOGLE_GMAIL_TOKEN_COMMAND") {
            self.google.gmail_token_command = Some(value);
        }

        if let Some(value) = read_env("ALIASYNC_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("ALIASYNC_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let llm_api_key = read_env("ALIASYNC_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = llm_api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ALIASYNC_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("ALIASYNC_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("ALIASYNC_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("ALIASYNC_LLM_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("ALIASYNC_LOGGING_LEVEL").or_else(|| read_env("ALIASYNC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ALIASYNC_LOGGING_FORMAT").or_else(|| read_env("ALIASYNC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(access_token) = overrides.access_token {
            self.google.access_token = Some(secret_value(access_token));
        }
        if let Some(gmail_access_token) = overrides.gmail_access_token {
            self.google.gmail_access_token = Some(secret_value(gmail_access_token));
        }
        if let Some(directory_base_url) = overrides.directory_base_url {
            self.google.directory_base_url = directory_base_url;
        }
        if let Some(gmail_base_url) = overrides.gmail_base_url {
            self.google.gmail_base_url = gmail_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_google(&self.google)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("aliasync.toml"), PathBuf::from("config/aliasync.toml")]
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

fn validate_base_url(key: &str, url: &str) -> Result<(), ConfigError> {
    let url = url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_google(google: &GoogleConfig) -> Result<(), ConfigError> {
    validate_base_url("google.directory_base_url", &google.directory_base_url)?;
    validate_base_url("google.gmail_base_url", &google.gmail_base_url)?;

    if google.customer.trim().is_empty() {
        return Err(ConfigError::Validation("google.customer must not be empty".to_string()));
    }

    if google.timeout_secs == 0 || google.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "google.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    validate_base_url("llm.base_url", &llm.base_url)?;
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    google: Option<GooglePatch>,
    catalog: Option<CatalogPatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GooglePatch {
    directory_base_url: Option<String>,
    gmail_base_url: Option<String>,
    customer: Option<String>,
    timeout_secs: Option<u64>,
    access_token: Option<String>,
    token_command: Option<String>,
    gmail_access_token: Option<String>,
    gmail_token_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
