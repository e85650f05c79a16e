//! # Bitbucket Server REST Client
//!
//! Native REST implementation of [`AccessKeyApi`](super::AccessKeyApi) and
//! [`WebhookApi`](super::WebhookApi) using reqwest with rustls.
//!
//! References:
//! - [Bitbucket Server REST API](https://docs.atlassian.com/bitbucket-server/rest/7.10.0/bitbucket-rest.html)
//! - [SSH keys REST API](https://docs.atlassian.com/bitbucket-server/rest/7.10.0/bitbucket-ssh-rest.html)

mod access_key;
mod webhook;

use super::ClientError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// TLS options for reaching the server
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM encoded CA bundle trusted in addition to the webpki roots
    pub ca_bundle: Option<String>,
    /// Accept any server certificate
    pub insecure_skip_verify: bool,
}

/// Connection settings for [`RestClient`]
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    pub tls: TlsOptions,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .field("tls", &self.tls)
            .finish()
    }
}

/// Bitbucket Server REST client
#[derive(Clone)]
pub struct RestClient {
    http_client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Bitbucket error response body
///
/// `{"errors":[{"context":null,"message":"...","exceptionName":"..."}]}`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    context: Option<String>,
    message: String,
    #[serde(default)]
    exception_name: Option<String>,
}

/// Paged collection wrapper used by list endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(default = "default_last_page")]
    is_last_page: bool,
    #[serde(default)]
    next_page_start: Option<u64>,
}

fn default_last_page() -> bool {
    true
}

impl RestClient {
    /// Create a client for the server at `base_url`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url));
        }

        let mut builder = Client::builder();
        if let Some(ca_bundle) = &config.tls.ca_bundle {
            for certificate in reqwest::Certificate::from_pem_bundle(ca_bundle.as_bytes())? {
                builder = builder.add_root_certificate(certificate);
            }
        }
        if config.tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url,
            token: config.token,
        })
    }

    /// Build a URL from the base URL and percent-encoded path segments
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    /// Send a request and map non-success statuses into [`ClientError`]
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("{} -> {}", response.url().path(), status.as_u16());

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        self.execute(request).await?;
        Ok(())
    }

    /// Collect every page of a paged collection
    async fn get_all_pages<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ClientError> {
        let mut values = Vec::new();
        let mut start = 0_u64;
        loop {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("start", &start.to_string());
            let request = self.request(reqwest::Method::GET, page_url);
            let page: Page<T> = self.send_json(request).await?;
            values.extend(page.values);

            match page.next_page_start {
                Some(next) if !page.is_last_page && next > start => start = next,
                _ => break,
            }
        }
        Ok(values)
    }
}

/// Render a Bitbucket error body, falling back to the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) if !response.errors.is_empty() => response
            .errors
            .iter()
            .map(|e| match (&e.context, &e.exception_name) {
                (Some(context), _) => format!("{context}: {}", e.message),
                (None, Some(exception)) => format!("{} ({exception})", e.message),
                (None, None) => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => status
            .canonical_reason()
            .map_or_else(|| body.trim().to_string(), str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RestClient {
        RestClient::new(ClientConfig {
            base_url: base_url.to_string(),
            token: "token".to_string(),
            tls: TlsOptions::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = client("https://bitbucket.example.com/");
        let segments = [
            "rest", "api", "1.0", "projects", "MY PROJ", "repos", "a/b", "webhooks",
        ];
        let url = client.url(&segments).unwrap();
        assert_eq!(
            url.as_str(),
            "https://bitbucket.example.com/rest/api/1.0/projects/MY%20PROJ/repos/a%2Fb/webhooks"
        );
    }

    #[test]
    fn test_url_keeps_context_path() {
        let client = client("https://example.com/bitbucket");
        let url = client.url(&["rest", "keys", "1.0"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/bitbucket/rest/keys/1.0");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = RestClient::new(ClientConfig {
            base_url: "not a url".to_string(),
            token: String::new(),
            tls: TlsOptions::default(),
        });
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_error_message_joins_errors() {
        let body = r#"{"errors":[{"context":"url","message":"must be https","exceptionName":null},{"message":"bad"}]}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "url: must be https; bad"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>"),
            "Internal Server Error"
        );
    }
}
