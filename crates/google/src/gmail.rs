use std::sync::Arc;

use aliasync_core::{
    AliasBinding, AliasStore, EmailAddress, Principal, ProviderError, VerificationStatus,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{endpoint, GoogleHttp};

/// Gmail `users.settings.sendAs` for one mailbox at a time.
pub struct GmailSendAsStore {
    http: Arc<GoogleHttp>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendAs {
    send_as_email: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    treat_as_alias: bool,
    #[serde(default)]
    verification_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSendAsResponse {
    #[serde(default)]
    send_as: Vec<SendAs>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSendAs<'a> {
    send_as_email: &'a str,
    display_name: &'a str,
    treat_as_alias: bool,
}

impl GmailSendAsStore {
    pub fn new(http: Arc<GoogleHttp>, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    fn send_as_url(
        &self,
        mailbox: &Principal,
        address: Option<&EmailAddress>,
    ) -> Result<reqwest::Url, ProviderError> {
        let mut segments = vec!["gmail", "v1", "users", mailbox.as_str(), "settings", "sendAs"];
        if let Some(address) = address {
            segments.push(address.as_str());
        }
        endpoint(&self.base_url, &segments)
    }
}

#[async_trait]
impl AliasStore for GmailSendAsStore {
    async fn list(&self, mailbox: &Principal) -> Result<Vec<AliasBinding>, ProviderError> {
        let response: ListSendAsResponse =
            self.http.get_json(self.send_as_url(mailbox, None)?).await?;

        let mut bindings = Vec::with_capacity(response.send_as.len());
        for entry in response.send_as {
            let address = match EmailAddress::parse(&entry.send_as_email) {
                Ok(address) => address,
                Err(error) => {
                    warn!(
                        event_name = "gmail.send_as_unparseable",
                        principal = %mailbox,
                        raw = %entry.send_as_email,
                        error = %error,
                        "ignoring send-as entry with an unusable address"
                    );
                    continue;
                }
            };
            bindings.push(AliasBinding {
                address,
                display_name: entry.display_name,
                verification_status: VerificationStatus::from_provider(
                    entry.verification_status.as_deref(),
                ),
                is_primary: entry.is_primary,
                treat_as_alias: entry.treat_as_alias,
            });
        }
        Ok(bindings)
    }

    async fn create(
        &self,
        mailbox: &Principal,
        address: &EmailAddress,
        display_name: &str,
    ) -> Result<VerificationStatus, ProviderError> {
        let body =
            CreateSendAs { send_as_email: address.as_str(), display_name, treat_as_alias: true };
        let created: SendAs = self.http.post_json(self.send_as_url(mailbox, None)?, &body).await?;
        Ok(VerificationStatus::from_provider(created.verification_status.as_deref()))
    }

    async fn delete(
        &self,
        mailbox: &Principal,
        address: &EmailAddress,
    ) -> Result<(), ProviderError> {
        self.http.delete(self.send_as_url(mailbox, Some(address))?).await
    }
}
