use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use aliasync_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path: config_path.clone(),
        overrides: ConfigOverrides::default(),
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = config_path.filter(|path| path.exists()).or_else(detect_config_path);
    let sources = Sources { doc: load_config_file_doc(file_path.as_deref()), path: file_path };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let google = &config.google;
    lines.push(sources.line(
        "google.directory_base_url",
        &google.directory_base_url,
        &["ALIASYNC_GOOGLE_DIRECTORY_BASE_URL"],
    ));
    lines.push(sources.line(
        "google.gmail_base_url",
        &google.gmail_base_url,
        &["ALIASYNC_GOOGLE_GMAIL_BASE_URL"],
    ));
    lines.push(sources.line("google.customer", &google.customer, &["ALIASYNC_GOOGLE_CUSTOMER"]));
    lines.push(sources.line(
        "google.timeout_secs",
        &google.timeout_secs.to_string(),
        &["ALIASYNC_GOOGLE_TIMEOUT_SECS"],
    ));
    lines.push(sources.line(
        "google.access_token",
        &redact(google.access_token.as_ref()),
        &["ALIASYNC_GOOGLE_ACCESS_TOKEN"],
    ));
    lines.push(sources.line(
        "google.token_command",
        google.token_command.as_deref().unwrap_or("<unset>"),
        &["ALIASYNC_GOOGLE_TOKEN_COMMAND"],
    ));
    lines.push(sources.line(
        "google.gmail_access_token",
        &redact(google.gmail_access_token.as_ref()),
        &["ALIASYNC_GOOGLE_GMAIL_ACCESS_TOKEN"],
    ));
    lines.push(sources.line(
        "google.gmail_token_command",
        google.gmail_token_command.as_deref().unwrap_or("<unset>"),
        &["ALIASYNC_GOOGLE_GMAIL_TOKEN_COMMAND"],
    ));

    let catalog_path = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    lines.push(sources.line("catalog.path", &catalog_path, &["ALIASYNC_CATALOG_PATH"]));

    lines.push(sources.line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        &["ALIASYNC_LLM_PROVIDER"],
    ));
    lines.push(sources.line("llm.model", &config.llm.model, &["ALIASYNC_LLM_MODEL"]));
    lines.push(sources.line("llm.base_url", &config.llm.base_url, &["ALIASYNC_LLM_BASE_URL"]));
    lines.push(sources.line(
        "llm.api_key",
        &redact(config.llm.api_key.as_ref()),
        &["ALIASYNC_LLM_API_KEY", "OPENAI_API_KEY"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["ALIASYNC_LOGGING_LEVEL", "ALIASYNC_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["ALIASYNC_LOGGING_FORMAT", "ALIASYNC_LOG_FORMAT"],
    ));

    lines.join("\n")
}

struct Sources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl Sources {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("aliasync.toml"), PathBuf::from("config/aliasync.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    // Google OAuth tokens start with `ya29.`; OpenAI keys with `sk-`.
    for prefix in ["ya29.", "sk-"] {
        if trimmed.starts_with(prefix) {
            return format!("{prefix}***");
        }
    }

    "<redacted>".to_string()
}
