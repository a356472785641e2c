//! HTTP fetcher shared by every HTTP-backed adapter.
//!
//! Each adapter owns one [`HttpFetcher`] configured with the upstream's base
//! URL, default header set and TLS policy. The wrapper keeps a persistent
//! cookie jar, follows redirects and applies one timeout to every call; there
//! are no retries at this layer.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Error, Result};

/// Default per-request deadline, shared by all adapters.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const BODY_SNIPPET_LIMIT: usize = 512;

/// Builder for [`HttpFetcher`].
pub struct HttpFetcherBuilder {
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
    verify_tls: bool,
}

impl HttpFetcherBuilder {
    /// Override the per-request timeout (default 60 s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Toggle TLS certificate verification. A couple of the court systems
    /// serve certificates that do not validate, matching what a browser user
    /// clicks through.
    #[must_use]
    pub const fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Add a default header sent with every request.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> Result<HttpFetcher> {
        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(self.headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()
            .map_err(Error::Network)?;
        Ok(HttpFetcher {
            client,
            base_url: self.base_url,
        })
    }
}

/// HTTP client wrapper bound to a single upstream.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Start building a fetcher for `base_url` (no trailing slash).
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HttpFetcherBuilder {
        HttpFetcherBuilder {
            base_url: base_url.into(),
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
        }
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    /// GET `path` with a query string, returning the checked response.
    ///
    /// Query pairs are sent in the given order; several upstreams treat the
    /// ordering as part of the form contract.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        debug!(path, pairs = query.len(), "GET");
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::check_status(response).await
    }

    /// GET `path` and return the body as text.
    pub async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self.get(path, query).await?;
        Ok(response.text().await?)
    }

    /// GET `path` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.get(path, query).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// POST a JSON body to `path` and decode a JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(path, "POST json");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// POST an `application/x-www-form-urlencoded` body, returning the
    /// response text. Pairs are encoded in order.
    pub async fn post_form(&self, path: &str, fields: &[(&str, String)]) -> Result<String> {
        debug!(path, fields = fields.len(), "POST form");
        let response = self
            .client
            .post(self.url(path))
            .form(fields)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.text().await?)
    }

    /// GET `path` and hand back the checked response for streaming reads
    /// (content-type dispatch, large PDF bodies).
    pub async fn stream(&self, path: &str) -> Result<Response> {
        debug!(path, "GET stream");
        let response = self.client.get(self.url(path)).send().await?;
        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let mut snippet: String = body.chars().take(BODY_SNIPPET_LIMIT).collect();
        if body.len() > snippet.len() {
            snippet.push('…');
        }
        Err(Error::Status {
            status: status.as_u16(),
            body: snippet,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Deserialize)]
    struct Echo {
        value: String,
    }

    #[tokio::test]
    async fn get_json_decodes_body() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value":"ok"}"#))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri()).build()?;
        let echo: Echo = fetcher.get_json("/doc", &[]).await?;
        assert_eq!(echo.value, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error_with_body() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such record"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri()).build()?;
        let err = fetcher.get_text("/missing", &[]).await.unwrap_err();
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("no such record"));
            },
            other => panic!("expected Status error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_maps_to_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri()).build()?;
        let result: Result<Echo> = fetcher.get_json("/broken", &[]).await;
        assert!(matches!(result, Err(Error::Decode(_))));
        Ok(())
    }

    #[tokio::test]
    async fn default_headers_are_sent() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value":"seen"}"#))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri())
            .header("X-Requested-With", "XMLHttpRequest")
            .build()?;
        let echo: Echo = fetcher.post_json("/search", &serde_json::json!({})).await?;
        assert_eq!(echo.value, "seen");
        Ok(())
    }

    #[tokio::test]
    async fn form_fields_are_encoded_in_order() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Arama/Search"))
            .and(body_string_contains("BolumId=&UyusmazlikId="))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri()).build()?;
        let body = fetcher
            .post_form(
                "/Arama/Search",
                &[("BolumId", String::new()), ("UyusmazlikId", String::new())],
            )
            .await?;
        assert!(body.contains("table"));
        Ok(())
    }

    #[tokio::test]
    async fn timeout_maps_to_timeout_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::builder(server.uri())
            .timeout(Duration::from_millis(100))
            .build()?;
        let err = fetcher.get_text("/slow", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
        Ok(())
    }
}
