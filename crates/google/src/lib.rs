//! Google Workspace providers for aliasync.
//!
//! The Directory API answers membership questions, Gmail settings own the
//! send-as aliases, and a handful of admin calls back the `ask` command.

pub mod auth;
pub mod client;
pub mod directory;
pub mod gmail;
pub mod workspace;

use std::sync::Arc;
use std::time::Duration;

use aliasync_core::config::{GoogleConfig, TokenSourceConfig};
use aliasync_core::{ConfigError, ConservativeMembershipOracle};

pub use auth::TokenSource;
pub use client::GoogleHttp;
pub use directory::GoogleDirectory;
pub use gmail::GmailSendAsStore;
pub use workspace::{
    GmailFilter, GoogleWorkspaceAdmin, Group, GroupMember, Label, UserName, WorkspaceUser,
};

/// Providers built from one `[google]` config section.
pub struct GoogleProviders {
    directory_http: Arc<GoogleHttp>,
    gmail_http: Arc<GoogleHttp>,
    config: GoogleConfig,
}

impl GoogleProviders {
    pub fn from_config(config: &GoogleConfig) -> Result<Self, ConfigError> {
        config.require_token_sources()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let directory_token = config.directory_token().ok_or_else(|| {
            ConfigError::Validation("google directory token source is not configured".to_string())
        })?;

        let build = |source: &TokenSourceConfig| {
            GoogleHttp::new(TokenSource::from_config(source), timeout)
                .map(Arc::new)
                .map_err(|error| ConfigError::Validation(format!("http client: {error}")))
        };

        let directory_http = build(&directory_token)?;
        // Without a dedicated Gmail source both APIs share one cached token.
        let gmail_http = match config.dedicated_gmail_token() {
            Some(source) => build(&source)?,
            None => Arc::clone(&directory_http),
        };

        Ok(Self { directory_http, gmail_http, config: config.clone() })
    }

    pub fn directory(&self) -> GoogleDirectory {
        GoogleDirectory::new(Arc::clone(&self.directory_http), &self.config.directory_base_url)
    }

    pub fn membership_oracle(&self) -> ConservativeMembershipOracle<GoogleDirectory> {
        ConservativeMembershipOracle::new(self.directory())
    }

    pub fn send_as_store(&self) -> GmailSendAsStore {
        GmailSendAsStore::new(Arc::clone(&self.gmail_http), &self.config.gmail_base_url)
    }

    pub fn admin(&self) -> GoogleWorkspaceAdmin {
        GoogleWorkspaceAdmin::new(
            Arc::clone(&self.directory_http),
            Arc::clone(&self.gmail_http),
            &self.config.directory_base_url,
            &self.config.gmail_base_url,
            &self.config.customer,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aliasync_core::config::AppConfig;
    use secrecy::SecretString;

    use super::GoogleProviders;

    #[test]
    fn gmail_reuses_directory_client_without_dedicated_token() {
        let mut config = AppConfig::default().google;
        config.token_command = Some("gcloud auth print-access-token".to_string());

        let providers = GoogleProviders::from_config(&config).expect("providers");
        assert!(Arc::ptr_eq(&providers.directory_http, &providers.gmail_http));
        assert_eq!(providers.gmail_http.token().describe(), "command");
    }

    #[test]
    fn dedicated_gmail_token_gets_its_own_client() {
        let mut config = AppConfig::default().google;
        config.token_command = Some("gcloud auth print-access-token".to_string());
        config.gmail_access_token = Some(SecretString::from("ya29.gmail".to_string()));

        let providers = GoogleProviders::from_config(&config).expect("providers");
        assert!(!Arc::ptr_eq(&providers.directory_http, &providers.gmail_http));
        assert_eq!(providers.gmail_http.token().describe(), "static");
        assert_eq!(providers.directory_http.token().describe(), "command");
    }

    #[test]
    fn missing_token_source_is_a_config_error() {
        let config = AppConfig::default().google;
        assert!(GoogleProviders::from_config(&config).is_err());
    }
}
