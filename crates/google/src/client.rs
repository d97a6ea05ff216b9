use std::time::Duration;

use aliasync_core::ProviderError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{expose, TokenSource};

/// Authenticated JSON client shared by the Directory and Gmail providers.
pub struct GoogleHttp {
    client: Client,
    token: TokenSource,
}

impl GoogleHttp {
    pub fn new(token: TokenSource, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;
        Ok(Self { client, token })
    }

    pub fn token(&self) -> &TokenSource {
        &self.token
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        let response = self.send(self.client.request(Method::GET, url)).await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.client.request(Method::POST, url).json(body)).await?;
        decode(response).await
    }

    pub async fn delete(&self, url: Url) -> Result<(), ProviderError> {
        self.send(self.client.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let token = self.token.bearer().await?;
        let response = request
            .bearer_auth(expose(token))
            .send()
            .await
            .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        debug!(
            event_name = "google.response",
            status = status.as_u16(),
            path = response.url().path(),
            "google api responded"
        );
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = status_error(status, &body);
        warn!(event_name = "google.error_status", status = status.as_u16(), error = %error);
        Err(error)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let body = response.bytes().await.map_err(|error| ProviderError::Transport(error.to_string()))?;
    serde_json::from_slice(&body).map_err(|error| ProviderError::Decode(error.to_string()))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("no response body").to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });

    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        StatusCode::CONFLICT => ProviderError::Conflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(message),
        other => ProviderError::Status { status: other.as_u16(), message },
    }
}

/// Appends percent-encoded path segments to a configured base URL.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base)
        .map_err(|error| ProviderError::Transport(format!("invalid base url `{base}`: {error}")))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::Transport(format!("base url `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::{endpoint, status_error};
    use aliasync_core::ProviderError;
    use reqwest::StatusCode;

    #[test]
    fn google_error_envelope_message_is_surfaced() {
        let body = r#"{"error": {"code": 404, "message": "Resource Not Found: groupKey"}}"#;
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, body),
            ProviderError::NotFound("Resource Not Found: groupKey".to_string())
        );
    }

    #[test]
    fn status_codes_map_to_provider_error_kinds() {
        assert!(matches!(status_error(StatusCode::CONFLICT, ""), ProviderError::Conflict(_)));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "nope"),
            ProviderError::Unauthorized(_)
        ));
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            ProviderError::Status { status: 503, message: "Service Unavailable".to_string() }
        );
    }

    #[test]
    fn endpoint_encodes_segments_against_base_path() {
        let url = endpoint(
            "https://gmail.googleapis.com/",
            &["gmail", "v1", "users", "jwest@utahmmc.com", "settings", "sendAs", "a b@x.com"],
        )
        .expect("url");
        assert_eq!(url.path(), "/gmail/v1/users/jwest@utahmmc.com/settings/sendAs/a%20b@x.com");
        assert_eq!(url.host_str(), Some("gmail.googleapis.com"));
    }
}
