//! Firestore REST API client.
//!
//! - Token caching with refresh margin, one re-auth on expired tokens
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter via [`FirestoreClient::with_retry`]
//! - Tracing spans and metrics on every request
//! - Emulator support through `FIRESTORE_EMULATOR_HOST`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{LibraryError, LibraryResult};
use crate::metrics::{record_query_results, record_request};
use crate::retry::RetryConfig;
use crate::token_cache::{Credentials, TokenCache};
use crate::types::{Document, RunQueryRequest, RunQueryResponse, StructuredQuery, Value};

const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// `host:port` of a local emulator; disables real authentication
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LibraryResult<Self> {
        let emulator_host = std::env::var("FIRESTORE_EMULATOR_HOST")
            .ok()
            .filter(|h| !h.is_empty());

        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| emulator_host.as_ref().map(|_| "demo-storyreel".to_string()))
            .ok_or_else(|| {
                LibraryError::Config(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore".into(),
                )
            })?;

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host,
        })
    }

    /// Config pointing at a local emulator.
    pub fn emulator(host: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            emulator_host: Some(host.into()),
        }
    }

    /// Root URL of the documents resource.
    fn documents_url(&self) -> String {
        let endpoint = match &self.emulator_host {
            Some(host) => format!("http://{}/v1", host),
            None => FIRESTORE_ENDPOINT.to_string(),
        };
        format!(
            "{}/projects/{}/databases/{}/documents",
            endpoint, self.project_id, self.database_id
        )
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    credentials: Credentials,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    ///
    /// Uses the service account from `GOOGLE_APPLICATION_CREDENTIALS` unless
    /// an emulator host is configured.
    pub async fn new(config: FirestoreConfig) -> LibraryResult<Self> {
        let credentials = if config.emulator_host.is_some() {
            Credentials::Emulator
        } else {
            Credentials::ServiceAccount(Arc::new(TokenCache::new(Self::create_auth_provider()?)))
        };
        Self::with_credentials(config, credentials)
    }

    /// Create a client with explicit credentials.
    pub fn with_credentials(config: FirestoreConfig, credentials: Credentials) -> LibraryResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("reel-library/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(LibraryError::Network)?;

        let base_url = config.documents_url();

        Ok(Self {
            http,
            config,
            base_url,
            credentials,
        })
    }

    fn create_auth_provider() -> LibraryResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            LibraryError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(LibraryError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> LibraryResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    /// Send a request, re-authenticating once if the token expired mid-flight.
    async fn send_authorized<F>(&self, build: F) -> LibraryResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.credentials.token().await?;
        let response = build(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(LibraryError::from_http_status(
                401,
                format!("{} failed: {}", url, body),
            ));
        }

        debug!("Access token expired, refreshing and retrying once");
        self.credentials.invalidate().await;
        let token = self.credentials.token().await?;
        Ok(build(&token).send().await?)
    }

    /// Get a document; `None` if it does not exist.
    pub async fn get_document(&self, collection: &str, doc_id: &str) -> LibraryResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|token| self.http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(Some(doc))
                }
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document; fails with `AlreadyExists` if the id is taken.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> LibraryResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    let doc: Document = response.json().await?;
                    Ok(doc)
                }
                StatusCode::CONFLICT => Err(LibraryError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge `fields` into an existing document.
    ///
    /// Only the paths in `update_mask` are written. The document must already
    /// exist; a missing document yields `NotFound` instead of an implicit create.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Vec<String>,
    ) -> LibraryResult<Document> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        params.push("currentDocument.exists=true".to_string());

        let url = format!(
            "{}?{}",
            self.document_path(collection, doc_id),
            params.join("&")
        );
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(doc)
                }
                // Firestore reports a failed `exists` precondition as 404 or 400 FAILED_PRECONDITION.
                StatusCode::NOT_FOUND => Err(LibraryError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                StatusCode::BAD_REQUEST => {
                    let body = response.text().await.unwrap_or_default();
                    if body.contains("FAILED_PRECONDITION") || body.contains("NOT_FOUND") {
                        Err(LibraryError::not_found(format!("{}/{}", collection, doc_id)))
                    } else {
                        Err(LibraryError::from_http_status(
                            400,
                            format!("{} failed: {}", url, body),
                        ))
                    }
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> LibraryResult<()> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|token| self.http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run a structured query.
    ///
    /// `parent_path` is the document containing the queried collection, or
    /// `None` for a top-level collection.
    pub async fn run_query(
        &self,
        parent_path: Option<&str>,
        query: StructuredQuery,
    ) -> LibraryResult<Vec<Document>> {
        let url = match parent_path {
            Some(parent) => format!("{}/{}:runQuery", self.base_url, parent),
            None => format!("{}:runQuery", self.base_url),
        };
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    // runQuery streams a JSON array; entries without a document carry only readTime.
                    let responses: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            LibraryError::InvalidResponse(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body.chars().take(200).collect::<String>()
                            ))
                        })?;

                    let docs: Vec<Document> =
                        responses.into_iter().filter_map(|r| r.document).collect();
                    record_query_results(&collection, docs.len());
                    Ok(docs)
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Execute with the configured retry policy.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> LibraryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = LibraryResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> LibraryResult<T>
    where
        F: std::future::Future<Output = LibraryResult<T>>,
    {
        let span = match doc_id {
            Some(id) => {
                info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
            }
            None => info_span!("firestore_request", operation = %operation, collection = %collection),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> LibraryError {
        let body = response.text().await.unwrap_or_default();
        LibraryError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "GCP_PROJECT_ID",
            "FIREBASE_PROJECT_ID",
            "FIRESTORE_EMULATOR_HOST",
            "FIRESTORE_CONNECT_TIMEOUT_SECS",
            "FIRESTORE_DATABASE_ID",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_project_id() {
        clear_env();
        let result = FirestoreConfig::from_env();
        assert!(matches!(result, Err(LibraryError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        std::env::set_var("GCP_PROJECT_ID", "test-project");

        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.database_id, "(default)");
        assert!(config.emulator_host.is_none());
        assert_eq!(
            config.documents_url(),
            "https://firestore.googleapis.com/v1/projects/test-project/databases/(default)/documents"
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_emulator_needs_no_project() {
        clear_env();
        std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");

        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
        assert!(config
            .documents_url()
            .starts_with("http://localhost:8080/v1/projects/demo-storyreel/"));

        clear_env();
    }

    #[test]
    fn test_token_expiry_detection() {
        assert!(FirestoreClient::is_access_token_expired(
            r#"{"error": {"status": "UNAUTHENTICATED"}}"#
        ));
        assert!(!FirestoreClient::is_access_token_expired("permission denied"));
    }
}
