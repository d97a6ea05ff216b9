use std::process::Stdio;

use aliasync_core::config::TokenSourceConfig;
use aliasync_core::ProviderError;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Supplies the bearer token for Google API calls.
///
/// Command sources run once per process; the printed token is reused for
/// every later request.
pub struct TokenSource {
    kind: TokenKind,
    cached: OnceCell<SecretString>,
}

enum TokenKind {
    Static(SecretString),
    Command(String),
}

impl TokenSource {
    pub fn from_config(config: &TokenSourceConfig) -> Self {
        match config {
            TokenSourceConfig::Static(token) => Self::fixed(token.clone()),
            TokenSourceConfig::Command(command) => Self::command(command.clone()),
        }
    }

    pub fn fixed(token: SecretString) -> Self {
        Self { kind: TokenKind::Static(token), cached: OnceCell::new() }
    }

    pub fn command(command: impl Into<String>) -> Self {
        Self { kind: TokenKind::Command(command.into()), cached: OnceCell::new() }
    }

    pub fn describe(&self) -> &'static str {
        match self.kind {
            TokenKind::Static(_) => "static",
            TokenKind::Command(_) => "command",
        }
    }

    pub async fn bearer(&self) -> Result<&SecretString, ProviderError> {
        match &self.kind {
            TokenKind::Static(token) => Ok(token),
            TokenKind::Command(command) => {
                self.cached.get_or_try_init(|| run_token_command(command)).await
            }
        }
    }
}

async fn run_token_command(command: &str) -> Result<SecretString, ProviderError> {
    debug!(event_name = "google.token_command", "fetching access token from command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|error| ProviderError::Token(format!("failed to spawn token command: {error}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Token(format!(
            "token command exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let token = String::from_utf8(output.stdout)
        .map_err(|_| ProviderError::Token("token command printed non-UTF-8 output".to_string()))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(ProviderError::Token("token command printed an empty token".to_string()));
    }

    Ok(SecretString::from(token.to_string()))
}

pub(crate) fn expose(token: &SecretString) -> &str {
    token.expose_secret()
}
