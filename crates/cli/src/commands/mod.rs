pub mod ask;
pub mod catalog;
pub mod config;
pub mod doctor;
pub mod sync;
pub mod users;

use std::path::{Path, PathBuf};

use aliasync_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use aliasync_core::{AliasCatalog, ConfigError};
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURES: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_SNAPSHOT: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_json<T: Serialize>(command: &str, value: &T) -> Result<String, CommandResult> {
    serde_json::to_string_pretty(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), EXIT_FAILURES)
    })
}

pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
) -> Result<AppConfig, ConfigError> {
    AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        overrides: ConfigOverrides { catalog_path, ..ConfigOverrides::default() },
    })
}

/// The configured catalog file, or the built-in brand catalog.
pub(crate) fn resolve_catalog(path: Option<&Path>) -> Result<AliasCatalog, ConfigError> {
    let catalog = match path {
        Some(path) => AliasCatalog::load(path)?,
        None => AliasCatalog::builtin()?,
    };
    catalog.validate()?;
    Ok(catalog)
}
