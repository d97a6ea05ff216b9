use std::sync::Arc;

use aliasync_core::{DirectoryClient, EmailAddress, Principal, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;

use crate::client::{endpoint, GoogleHttp};

/// Admin SDK Directory `groups.hasMember`.
pub struct GoogleDirectory {
    http: Arc<GoogleHttp>,
    base_url: String,
}

#[derive(Deserialize)]
struct HasMemberResponse {
    #[serde(rename = "isMember", default)]
    is_member: bool,
}

impl GoogleDirectory {
    pub fn new(http: Arc<GoogleHttp>, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl DirectoryClient for GoogleDirectory {
    async fn has_member(
        &self,
        group: &EmailAddress,
        principal: &Principal,
    ) -> Result<bool, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &[
                "admin",
                "directory",
                "v1",
                "groups",
                group.as_str(),
                "hasMember",
                principal.as_str(),
            ],
        )?;
        let response: HasMemberResponse = self.http.get_json(url).await?;
        Ok(response.is_member)
    }
}
