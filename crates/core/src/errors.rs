use std::path::PathBuf;

use thiserror::Error;

use crate::domain::address::EmailAddress;

/// Fatal problems detected before any provider is contacted.
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
    #[error("principal must not be empty")]
    EmptyPrincipal,
    #[error("alias catalog must contain at least one address")]
    EmptyCatalog,
    #[error("alias catalog lists `{0}` more than once")]
    DuplicateAlias(EmailAddress),
    #[error("invalid mail address `{0}`")]
    InvalidAddress(String),
}

/// Failure reported by a directory or mailbox provider.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("permission denied: {0}")]
    Unauthorized(String),
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("access token unavailable: {0}")]
    Token(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("membership query for `{group}` failed: {source}")]
pub struct MembershipQueryError {
    pub group: EmailAddress,
    pub source: ProviderError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasOperation {
    Create,
    Delete,
}

impl AliasOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for AliasOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{operation} of alias `{address}` failed: {source}")]
pub struct AliasOperationError {
    pub operation: AliasOperation,
    pub address: EmailAddress,
    pub source: ProviderError,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not list send-as aliases for `{principal}`: {source}")]
pub struct SnapshotError {
    pub principal: String,
    pub source: ProviderError,
}

/// Errors that abort a reconciliation run as a whole.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl ReconcileError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use crate::domain::address::EmailAddress;
    use crate::errors::{
        AliasOperation, AliasOperationError, ConfigError, ProviderError, ReconcileError,
        SnapshotError,
    };

    #[test]
    fn alias_operation_error_names_operation_and_address() {
        let error = AliasOperationError {
            operation: AliasOperation::Delete,
            address: EmailAddress::parse("ap@tntdump.com").expect("address"),
            source: ProviderError::NotFound("sendAs ap@tntdump.com".to_string()),
        };

        assert_eq!(
            error.to_string(),
            "delete of alias `ap@tntdump.com` failed: not found: sendAs ap@tntdump.com"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn fatal_errors_carry_stable_classes() {
        let config = ReconcileError::from(ConfigError::EmptyCatalog);
        let snapshot = ReconcileError::from(SnapshotError {
            principal: "jwest@utahmmc.com".to_string(),
            source: ProviderError::Transport("connection reset".to_string()),
        });

        assert_eq!(config.error_class(), "config_validation");
        assert_eq!(snapshot.error_class(), "snapshot");
        assert!(snapshot.to_string().contains("jwest@utahmmc.com"));
    }
}
