//! Skillset management client implementation
//!
//! Provides an async HTTP client for the skillset collection of a search
//! service with:
//! - Create, upsert, get, list, delete and reset-skills calls
//! - ETag preconditions on every mutating call
//! - Retry with exponential backoff on throttling and transient unavailability

use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG};
use reqwest::{Client as HttpClient, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECS, ServiceConfig};
use crate::error::{Error, Result};
use crate::models::{Skillset, SkillsetChanges};

use super::conditions::{MatchCondition, SkillsetTarget};
use super::status::{Operation, error_for_status};

/// Maximum number of attempts for throttled or unavailable requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BACKOFF_BASE_MS: u64 = 1000;

/// Longest server-suggested wait honored before giving up
const MAX_RETRY_WAIT_SECS: u64 = 60;

const API_KEY_HEADER: &str = "api-key";
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Envelope of collection responses
#[derive(Debug, Deserialize)]
struct SkillsetList {
    #[serde(default)]
    value: Vec<Skillset>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetSkillsRequest<'a> {
    skill_names: &'a [String],
}

/// Skillset management client
///
/// Holds only immutable configuration and a pooled HTTP client, so clones
/// are cheap and calls may be issued concurrently.
#[derive(Clone)]
pub struct SkillsetClient {
    /// HTTP client for making requests
    http_client: HttpClient,
    /// Service endpoint all resource paths are resolved against
    endpoint: Url,
    /// Credential presented on every request
    api_key: String,
    /// REST API version sent as a query parameter
    api_version: String,
    /// Attempts per call for retryable failures
    max_attempts: u32,
    /// Base delay for exponential backoff
    backoff_base_ms: u64,
}

impl std::fmt::Debug for SkillsetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillsetClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_version", &self.api_version)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Builder for creating a SkillsetClient
pub struct SkillsetClientBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
}

impl Default for SkillsetClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillsetClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: None,
            timeout_secs: None,
            max_attempts: None,
            backoff_base_ms: None,
        }
    }

    /// Set the service endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the REST API version
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set how many times a throttled call is attempted in total
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Set the base delay for retry backoff
    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.backoff_base_ms = Some(ms);
        self
    }

    /// Build the SkillsetClient
    pub fn build(self) -> Result<SkillsetClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| Error::ConfigError("Service endpoint is required".to_string()))?;
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| Error::ConfigError(format!("Invalid service endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!(
                "Service endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }

        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::ConfigError("API key is required".to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(Error::Network)?;

        Ok(SkillsetClient {
            http_client,
            endpoint,
            api_key,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            max_attempts: self.max_attempts.unwrap_or(MAX_RETRY_ATTEMPTS),
            backoff_base_ms: self.backoff_base_ms.unwrap_or(BACKOFF_BASE_MS),
        })
    }
}

impl SkillsetClient {
    /// Create a new SkillsetClient for the given endpoint and API key
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        SkillsetClientBuilder::new()
            .endpoint(endpoint)
            .api_key(api_key)
            .build()
    }

    /// Create a new builder for SkillsetClient
    pub fn builder() -> SkillsetClientBuilder {
        SkillsetClientBuilder::new()
    }

    /// Create a client from configuration, reading the API key from the environment
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let endpoint = config
            .require_endpoint()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        let api_key = config.resolved_api_key().ok_or_else(|| {
            Error::ConfigError("No API key found. Set SKILLSET_API_KEY or SEARCH_API_KEY.".to_string())
        })?;

        SkillsetClientBuilder::new()
            .endpoint(endpoint)
            .api_key(api_key)
            .api_version(config.api_version.clone())
            .timeout_secs(config.timeout_secs)
            .build()
    }

    /// The service endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Create a new skillset; fails with [`Error::AlreadyExists`] if the name is taken
    pub async fn create(&self, skillset: &Skillset) -> Result<Skillset> {
        skillset.validate()?;
        let body = serde_json::to_vec(skillset)?;
        let url = self.collection_url();

        let response = self
            .execute(Operation::Create, Some(&skillset.name), || {
                self.http_client
                    .post(url.clone())
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone())
            })
            .await?;

        let created = decode_skillset(response).await?;
        info!(skillset = %created.name, etag = ?created.etag, "Created skillset");
        Ok(created)
    }

    /// Create the skillset or replace it wholesale if it exists
    ///
    /// With [`MatchCondition::IfNotModified`] the write only happens if the
    /// skillset's ETag is still current; otherwise the service leaves it
    /// untouched and [`Error::PreconditionFailed`] is returned.
    pub async fn create_or_update(
        &self,
        skillset: &Skillset,
        condition: MatchCondition,
    ) -> Result<Skillset> {
        skillset.validate()?;
        let precondition = condition.header(skillset.etag.as_deref())?;
        let body = serde_json::to_vec(skillset)?;
        let url = self.skillset_url(&skillset.name, &[]);

        let response = self
            .execute(Operation::CreateOrUpdate, Some(&skillset.name), || {
                let request = self
                    .http_client
                    .put(url.clone())
                    .header(CONTENT_TYPE, "application/json")
                    .header("Prefer", "return=representation")
                    .body(body.clone());
                match &precondition {
                    Some((name, value)) => request.header(name.clone(), value.clone()),
                    None => request,
                }
            })
            .await?;

        let stored = decode_skillset(response).await?;
        info!(
            skillset = %stored.name,
            etag = ?stored.etag,
            condition = ?condition,
            "Stored skillset"
        );
        Ok(stored)
    }

    /// Apply `changes` to a previously fetched skillset and resubmit it
    ///
    /// Fields the changes leave unset are preserved, including the ETag the
    /// precondition is evaluated against.
    pub async fn update_in_place(
        &self,
        existing: &Skillset,
        changes: SkillsetChanges,
        condition: MatchCondition,
    ) -> Result<Skillset> {
        let merged = existing.merged(changes);
        self.create_or_update(&merged, condition).await
    }

    /// Fetch a skillset by name
    pub async fn get(&self, name: &str) -> Result<Skillset> {
        let url = self.skillset_url(name, &[]);
        let response = self
            .execute(Operation::Get, Some(name), || self.http_client.get(url.clone()))
            .await?;
        decode_skillset(response).await
    }

    /// Fetch every skillset in the service
    pub async fn list(&self) -> Result<Vec<Skillset>> {
        let url = self.collection_url();
        let response = self
            .execute(Operation::List, None, || self.http_client.get(url.clone()))
            .await?;

        let list: SkillsetList = serde_json::from_slice(&response.bytes().await?)?;
        let mut skillsets = list.value;
        skillsets.iter_mut().for_each(Skillset::strip_annotations);
        debug!(count = skillsets.len(), "Listed skillsets");
        Ok(skillsets)
    }

    /// Fetch only the names of the skillsets in the service
    pub async fn list_names(&self) -> Result<Vec<String>> {
        let mut url = self.collection_url();
        url.query_pairs_mut().append_pair("$select", "name");
        let response = self
            .execute(Operation::List, None, || self.http_client.get(url.clone()))
            .await?;

        let list: SkillsetList = serde_json::from_slice(&response.bytes().await?)?;
        Ok(list.value.into_iter().map(|s| s.name).collect())
    }

    /// Delete a skillset
    ///
    /// ETag-based conditions need the object form of `target`; passing a bare
    /// name with [`MatchCondition::IfNotModified`] is rejected before any
    /// request is sent.
    pub async fn delete<'a>(
        &self,
        target: impl Into<SkillsetTarget<'a>>,
        condition: MatchCondition,
    ) -> Result<()> {
        let target = target.into();
        let name = target.name();
        let precondition = condition.header(target.etag())?;
        let url = self.skillset_url(name, &[]);

        self.execute(Operation::Delete, Some(name), || {
            let request = self.http_client.delete(url.clone());
            match &precondition {
                Some((header, value)) => request.header(header.clone(), value.clone()),
                None => request,
            }
        })
        .await?;

        info!(skillset = %name, condition = ?condition, "Deleted skillset");
        Ok(())
    }

    /// Ask the service to recompute the named skills on the next indexer run
    pub async fn reset_skills<'a>(
        &self,
        target: impl Into<SkillsetTarget<'a>>,
        skill_names: &[String],
    ) -> Result<()> {
        let target = target.into();
        let name = target.name();
        if skill_names.is_empty() {
            return Err(Error::InvalidInput(
                "At least one skill name is required to reset skills".to_string(),
            ));
        }

        let body = serde_json::to_vec(&ResetSkillsRequest { skill_names })?;
        let url = self.skillset_url(name, &["search.resetskills"]);

        self.execute(Operation::ResetSkills, Some(name), || {
            self.http_client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
        })
        .await?;

        info!(skillset = %name, skills = skill_names.len(), "Reset skills");
        Ok(())
    }

    fn collection_url(&self) -> Url {
        self.url(&["skillsets"])
    }

    /// URL of a single skillset, optionally followed by an action segment
    fn skillset_url(&self, name: &str, rest: &[&str]) -> Url {
        let key = format!("skillsets('{}')", name.replace('\'', "''"));
        let mut segments = vec![key.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        url
    }

    /// Send a request, retrying throttled and unavailable responses with backoff
    async fn execute<F>(&self, op: Operation, name: Option<&str>, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.send_once(op, name, build()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempts < self.max_attempts => {
                    let suggested = match &e {
                        Error::RateLimited(secs) => *secs,
                        _ => 0,
                    };
                    if suggested > MAX_RETRY_WAIT_SECS {
                        warn!(
                            operation = %op,
                            retry_after_secs = suggested,
                            "Service asked for a longer wait than allowed, giving up"
                        );
                        return Err(e);
                    }
                    let backoff = calculate_backoff(attempts, suggested, self.backoff_base_ms);
                    warn!(
                        operation = %op,
                        attempt = attempts,
                        wait_ms = backoff,
                        error = %e,
                        "Request throttled, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a single request and turn error statuses into [`Error`]s
    async fn send_once(
        &self,
        op: Operation,
        name: Option<&str>,
        request: RequestBuilder,
    ) -> Result<Response> {
        let request_id = Uuid::new_v4().to_string();

        debug!(
            operation = %op,
            skillset = name.unwrap_or("*"),
            request_id = %request_id,
            "Sending skillset request"
        );

        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .header(CLIENT_REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let error = error_for_status(op, name, status, &headers, &body);
        debug!(
            operation = %op,
            status = status.as_u16(),
            request_id = %request_id,
            error = %error,
            "Skillset request failed"
        );
        Err(error)
    }
}

/// Decode a single skillset, falling back to the ETag response header
async fn decode_skillset(response: Response) -> Result<Skillset> {
    let header_etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut skillset: Skillset = serde_json::from_slice(&response.bytes().await?)?;
    if skillset.etag.is_none() {
        skillset.etag = header_etag;
    }
    skillset.strip_annotations();
    Ok(skillset)
}

/// Calculate backoff delay with jitter
///
/// The suggested wait is clamped to `MAX_RETRY_WAIT_SECS`.
fn calculate_backoff(attempt: u32, suggested_wait_secs: u64, base_ms: u64) -> u64 {
    let base = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let suggested_ms = suggested_wait_secs.min(MAX_RETRY_WAIT_SECS) * 1000;
    let delay = base.max(suggested_ms);

    // up to 10% jitter
    let jitter = delay / 10;
    if jitter == 0 {
        delay
    } else {
        delay.saturating_add(rand::thread_rng().gen_range(0..jitter))
    }
}
