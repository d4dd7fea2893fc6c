//! REST discovery backend.
//!
//! # Wire Protocol
//! ```text
//! publish:   POST   {register_path}         body: record document
//!            ← 2xx  stored document carrying "registration"
//! unpublish: DELETE {remove_path}/{id}      ← 2xx, 404 counts as removed
//! update:    PUT    {update_path}/{id}      body: record document
//! query:     GET    {records_path}          ← JSON array of documents
//! ```
//!
//! Filtering happens client-side after the listing is fetched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use crate::config::RestConfig;
use crate::discovery::error::{BackendError, BackendResult, Operation};
use crate::discovery::filter::RecordFilter;
use crate::discovery::record::{DiscoveredRecord, RecordDocument, RegistrationId, ServiceRecord};
use crate::discovery::DiscoveryBackend;
use crate::resilience::timeouts::bounded;

/// Longest response body excerpt copied into error messages.
const MAX_ERROR_BODY: usize = 256;

/// Discovery backend talking to an HTTP registry.
pub struct RestBackend {
    client: Client,
    base: url::Url,
    config: RestConfig,
    timeout: Duration,
}

impl RestBackend {
    pub fn new(config: &RestConfig, timeout: Duration) -> BackendResult<Self> {
        let endpoint = format!("{}:{}", config.host, config.port);
        let base = url::Url::parse(&format!("http://{}/", endpoint))
            .map_err(|e| BackendError::connection(&endpoint, format!("invalid registry address: {}", e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| BackendError::connection(&endpoint, e))?;

        Ok(Self {
            client,
            base,
            config: config.clone(),
            timeout,
        })
    }

    /// Configured path, plus the registration as one percent-encoded segment.
    fn url(&self, operation: Operation, path: &str, id: Option<&RegistrationId>) -> BackendResult<url::Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| BackendError::rejected(operation, format!("invalid path '{}': {}", path, e)))?;

        if let Some(id) = id {
            // Dot segments are dropped by the URL encoder and would address the parent.
            if matches!(id.as_str(), "" | "." | "..") {
                return Err(BackendError::rejected(
                    operation,
                    format!("registration '{}' cannot be addressed", id),
                ));
            }
            url.path_segments_mut()
                .map_err(|()| BackendError::rejected(operation, format!("invalid path '{}'", path)))?
                .pop_if_empty()
                .push(id.as_str());
        }
        Ok(url)
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn classify(&self, operation: Operation, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                operation,
                after: self.timeout,
            }
        } else if err.is_decode() || err.is_body() {
            BackendError::rejected(operation, format!("malformed response: {}", err))
        } else {
            BackendError::connection(self.endpoint(), err)
        }
    }

    /// Turn a non-success status into `Rejected`, keeping a body excerpt.
    async fn check(&self, operation: Operation, response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(BackendError::rejected(
            operation,
            format!("registry answered {}: {}", status, excerpt.trim()),
        ))
    }
}

#[async_trait]
impl DiscoveryBackend for RestBackend {
    fn kind(&self) -> &'static str {
        "rest"
    }

    async fn publish(&self, record: &ServiceRecord) -> BackendResult<RegistrationId> {
        let op = Operation::Publish;
        let url = self.url(op, &self.config.register_path, None)?;
        let doc = RecordDocument::from_record(record, None);

        bounded(op, self.timeout, async {
            let response = self
                .client
                .post(url)
                .json(&doc)
                .send()
                .await
                .map_err(|e| self.classify(op, e))?;
            let response = self.check(op, response).await?;
            let stored: RecordDocument = response.json().await.map_err(|e| self.classify(op, e))?;

            match stored.registration.filter(|id| !id.is_empty()) {
                Some(id) => Ok(RegistrationId::new(id)),
                None => Err(BackendError::rejected(op, "response carries no registration")),
            }
        })
        .await
    }

    async fn unpublish(&self, registration: &RegistrationId) -> BackendResult<()> {
        let op = Operation::Unpublish;
        let url = self.url(op, &self.config.remove_path, Some(registration))?;

        bounded(op, self.timeout, async {
            let response = self
                .client
                .delete(url)
                .send()
                .await
                .map_err(|e| self.classify(op, e))?;

            if response.status() == StatusCode::NOT_FOUND {
                tracing::debug!(registration = %registration, "Record already absent from registry");
                return Ok(());
            }
            self.check(op, response).await?;
            Ok::<(), BackendError>(())
        })
        .await
    }

    async fn update(&self, registration: &RegistrationId, record: &ServiceRecord) -> BackendResult<()> {
        let op = Operation::Update;
        let url = self.url(op, &self.config.update_path, Some(registration))?;
        let doc = RecordDocument::from_record(record, Some(registration));

        bounded(op, self.timeout, async {
            let response = self
                .client
                .put(url)
                .json(&doc)
                .send()
                .await
                .map_err(|e| self.classify(op, e))?;
            self.check(op, response).await?;
            Ok::<(), BackendError>(())
        })
        .await
    }

    async fn query(&self, filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>> {
        let op = Operation::Query;
        let url = self.url(op, &self.config.records_path, None)?;

        let docs: Vec<serde_json::Value> = bounded(op, self.timeout, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.classify(op, e))?;
            let response = self.check(op, response).await?;
            response.json().await.map_err(|e| self.classify(op, e))
        })
        .await?;

        let mut found = Vec::with_capacity(docs.len());
        for value in docs {
            let doc: RecordDocument = match serde_json::from_value(value) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable record");
                    continue;
                }
            };
            match doc.into_discovered() {
                Some(discovered) if filter.matches(&discovered.record) => found.push(discovered),
                Some(_) => {}
                None => tracing::warn!("Skipping record without registration"),
            }
        }
        Ok(found)
    }
}
