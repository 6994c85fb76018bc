//! HTTP transport for the place-search API.

use async_trait::async_trait;

use super::error::ApiError;

/// Issues one text-search request and returns the raw response body.
///
/// Implementations map HTTP-level failures onto [`ApiError`]; interpreting
/// the body is left to [`super::PlaceApiClient`].
#[async_trait]
pub trait PlaceTransport: Send + Sync {
    async fn text_search(&self, query: &str) -> Result<String, ApiError>;
}

/// Place-search transport over `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    api_key: String,
    language: String,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        api_key: &str,
        language: &str,
        timeout_secs: u64,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: format!("{}/textsearch/json", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl PlaceTransport for HttpTransport {
    async fn text_search(&self, query: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("query", query),
                ("key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::rate_limited("HTTP 429"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::invalid_response(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.text().await?)
    }
}
