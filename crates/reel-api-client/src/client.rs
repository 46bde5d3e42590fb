//! Story service HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use reel_models::{GenerationRequest, JobId, JobSnapshot};

use crate::error::{ApiError, ApiResult};
use crate::service::JobService;
use crate::types::{CreateStoryRequest, CreateStoryResponse, HealthResponse, StorySummary};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the story client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the story service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(300), // video generation requests are slow
            auth_token: None,
        }
    }
}

impl ApiClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("STORY_API_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("STORY_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            auth_token: std::env::var("STORY_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
        }
    }
}

/// Client for the story generation service.
#[derive(Debug, Clone)]
pub struct StoryApiClient {
    http: Client,
    config: ApiClientConfig,
    base: Url,
}

impl StoryApiClient {
    /// Create a new story client.
    pub fn new(config: ApiClientConfig) -> ApiResult<Self> {
        let mut base = Url::parse(&config.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        // Required when the service sits behind an ngrok free tunnel
        headers.insert(
            HeaderName::from_static("ngrok-skip-browser-warning"),
            HeaderValue::from_static("true"),
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(concat!("reel-api-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self { http, config, base })
    }

    /// Create from environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::new(ApiClientConfig::from_env())
    }

    /// Base URL with a trailing slash.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an artifact path reported by the service.
    ///
    /// Absolute URLs are returned unchanged; relative paths are joined onto
    /// the base URL.
    pub fn resolve_url(&self, path: &str) -> ApiResult<String> {
        resolve_against(&self.base, path)
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path)?)
    }

    fn story_endpoint(&self, job_id: &JobId) -> ApiResult<Url> {
        self.endpoint(&format!("api/stories/{}", job_id))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if the story service is healthy.
    pub async fn health_check(&self) -> ApiResult<bool> {
        let url = self.endpoint("health")?;

        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Story service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Story service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// List stories known to the service.
    pub async fn list_stories(&self) -> ApiResult<Vec<StorySummary>> {
        let url = self.endpoint("api/stories")?;
        let response = self.authorize(self.http.get(url)).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Submit a story for generation.
    pub async fn create_story(&self, request: &GenerationRequest) -> ApiResult<JobId> {
        let url = self.endpoint("api/stories")?;
        let body = CreateStoryRequest::from(request);

        debug!("Creating story via {}", url);

        let response = self.authorize(self.http.post(url)).json(&body).send().await?;
        let response = Self::check_status(response).await?;
        let created: CreateStoryResponse = response.json().await?;
        created.job_id()
    }

    /// Fetch the current status of a story.
    pub async fn get_story(&self, job_id: &JobId) -> ApiResult<JobSnapshot> {
        let url = self.story_endpoint(job_id)?;
        let response = self.authorize(self.http.get(url)).send().await?;
        let response = Self::check_status(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse story status: {} (body prefix: {})",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })
    }

    /// Cancel a running story.
    pub async fn cancel_story(&self, job_id: &JobId) -> ApiResult<()> {
        let url = self.story_endpoint(job_id)?;
        let response = self.authorize(self.http.delete(url)).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!("Story service returned {} for {}: {}", status, url, body);
        Err(ApiError::from_http_status(
            status.as_u16(),
            format!("{} failed: {}", url, body),
        ))
    }
}

#[async_trait]
impl JobService for StoryApiClient {
    async fn create_job(&self, request: &GenerationRequest) -> ApiResult<JobId> {
        self.create_story(request).await
    }

    async fn get_job_status(&self, job_id: &JobId) -> ApiResult<JobSnapshot> {
        self.get_story(job_id).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> ApiResult<()> {
        self.cancel_story(job_id).await
    }
}

/// Resolve `path` against `base`, keeping absolute URLs as they are.
///
/// Relative paths, including root-relative ones like `/files/abc.mp4`, land
/// under the base path, so a base mounted at a prefix keeps that prefix.
pub fn resolve_against(base: &Url, path: &str) -> ApiResult<String> {
    match Url::parse(path) {
        Ok(absolute) => Ok(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(base.join(path.trim_start_matches('/'))?.to_string())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = StoryApiClient::new(ApiClientConfig {
            base_url: "https://stories.example.com/backend".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://stories.example.com/backend/");
        assert_eq!(
            client.story_endpoint(&JobId::from("abc")).unwrap().as_str(),
            "https://stories.example.com/backend/api/stories/abc"
        );
    }

    #[test]
    fn test_resolve_url() {
        let client = StoryApiClient::new(ApiClientConfig::default()).unwrap();
        assert_eq!(
            client.resolve_url("/files/abc.mp4").unwrap(),
            "http://localhost:8000/files/abc.mp4"
        );
        assert_eq!(
            client.resolve_url("https://cdn.example.com/abc.mp4").unwrap(),
            "https://cdn.example.com/abc.mp4"
        );
    }

    #[test]
    fn test_resolve_keeps_base_path_prefix() {
        let base = Url::parse("https://stories.example.com/backend/").unwrap();
        assert_eq!(
            resolve_against(&base, "/files/abc.mp4").unwrap(),
            "https://stories.example.com/backend/files/abc.mp4"
        );
        assert_eq!(
            resolve_against(&base, "files/abc.mp4").unwrap(),
            "https://stories.example.com/backend/files/abc.mp4"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = StoryApiClient::new(ApiClientConfig {
            base_url: "not a url".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }
}
