//! Gateway to the external Typesense search service.
//!
//! All remote access to the engine goes through [`SearchGateway`], built
//! once at startup and shared across handlers. The gateway hides two
//! classes of operational noise:
//!
//! - **Transient unavailability** — every operation runs under the
//!   deadline/backoff loop in [`crate::retry`]; collection bootstrap uses
//!   its own bounded attempt count so a cold engine has time to come up.
//! - **Duplicate submissions** — [`SearchGateway::index_batch`] checks for
//!   an existing document id before creating, so re-uploading a batch is a
//!   no-op rather than an error or an update.
//!
//! # Engine API surface
//!
//! | Operation | Request |
//! |-----------|---------|
//! | collection lookup | `GET /collections/{name}` |
//! | collection create | `POST /collections` |
//! | document lookup | `GET /collections/{name}/documents/{id}` |
//! | document create | `POST /collections/{name}/documents` |
//! | search | `GET /collections/{name}/documents/search` |
//! | health | `GET /health` |
//!
//! Results are returned as the engine's native JSON; no local ranking or
//! reshaping happens here.
//!
//! # Races
//!
//! Two concurrent uploads of the same id can both pass the existence
//! check; the second create then fails with a 409, which is logged and
//! counted as a skip. The same applies to two processes bootstrapping the
//! collection at once. Neither case is serialized with a lock.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

use crate::config::TypesenseConfig;
use crate::error::GatewayError;
use crate::models::{IndexSummary, RepoDocument};
use crate::retry::with_deadline;

/// Fields the engine matches free-text queries against.
const QUERY_BY: &str = "name,description,organisation";

/// Long-lived client for the search engine.
pub struct SearchGateway {
    http: reqwest::Client,
    config: TypesenseConfig,
    /// Last-known engine connectivity, updated after every remote call.
    available: AtomicBool,
}

impl SearchGateway {
    /// Build a gateway from configuration. Does not touch the network;
    /// call [`ensure_collection`](Self::ensure_collection) to bootstrap.
    pub fn new(config: TypesenseConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            config,
            available: AtomicBool::new(false),
        })
    }

    /// The configured collection name.
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Last-known connectivity, without an outbound call.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    // ============ Collection bootstrap ============

    /// Make sure the collection exists, creating it with the fixed
    /// all-string schema if the engine reports it missing.
    ///
    /// Retries up to `connect_retries` times with a fixed delay while the
    /// engine is unavailable, then surfaces the last error. Safe to call
    /// on every startup; an existing collection is left untouched.
    pub async fn ensure_collection(&self) -> Result<(), GatewayError> {
        let retries = self.config.connect_retries.max(1);
        let delay = self.config.connect_retry_delay();
        let mut last_err = None;

        for attempt in 1..=retries {
            match self.lookup_or_create_collection().await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        error = %err,
                        attempt,
                        retries,
                        "search engine not ready, retrying"
                    );
                    last_err = Some(err);
                    if attempt < retries {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            GatewayError::Unavailable("collection bootstrap failed".to_string())
        }))
    }

    async fn lookup_or_create_collection(&self) -> Result<(), GatewayError> {
        let name = &self.config.collection;

        match self.get_json(&format!("/collections/{}", name)).await {
            Ok(_) => {
                tracing::info!(collection = %name, "collection exists");
                return Ok(());
            }
            Err(GatewayError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        match self.post_json("/collections", &collection_schema(name)).await {
            Ok(_) => {
                tracing::info!(collection = %name, "collection created");
                Ok(())
            }
            // Lost the bootstrap race against another process; the
            // collection exists now, which is all we wanted.
            Err(GatewayError::Remote { status: 409, body }) => {
                tracing::warn!(collection = %name, %body, "collection already created concurrently");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ============ Search ============

    /// Free-text search over the collection's name, description, and
    /// organisation fields. The engine's result object (hits, found,
    /// timing) is returned unmodified.
    pub async fn search(&self, query: &str) -> Result<serde_json::Value, GatewayError> {
        let path = format!("/collections/{}/documents/search", self.config.collection);

        with_deadline(self.config.op_deadline(), self.config.op_backoff(), || {
            let url = format!("{}{}", self.config.base_url(), path);
            async move {
                let response = self
                    .http
                    .get(&url)
                    .query(&[("q", query), ("query_by", QUERY_BY)])
                    .header("X-TYPESENSE-API-KEY", &self.config.api_key)
                    .send()
                    .await;
                self.check_json(response).await
            }
        })
        .await
    }

    // ============ Indexing ============

    /// Point lookup by document id.
    ///
    /// This is a pre-check for [`index_batch`](Self::index_batch), not a
    /// correctness guarantee: a concurrent create can still win the race,
    /// in which case the losing create's 409 is swallowed downstream.
    pub async fn document_exists(&self, id: &str) -> Result<bool, GatewayError> {
        let path = format!(
            "/collections/{}/documents/{}",
            self.config.collection, id
        );

        let result = with_deadline(self.config.op_deadline(), self.config.op_backoff(), || {
            let url = format!("{}{}", self.config.base_url(), path);
            async move {
                let response = self
                    .http
                    .get(&url)
                    .header("X-TYPESENSE-API-KEY", &self.config.api_key)
                    .send()
                    .await;
                self.check_json(response).await
            }
        })
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(GatewayError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Index a batch of documents, one at a time.
    ///
    /// Already-present ids are skipped; validation failures and engine
    /// rejections are logged and counted, and the batch continues to the
    /// next document. At-least-once, best-effort: there is no transaction
    /// across the batch.
    pub async fn index_batch(&self, documents: &[RepoDocument]) -> IndexSummary {
        let mut summary = IndexSummary::default();

        for document in documents {
            match self.index_document(document).await {
                Ok(true) => summary.indexed += 1,
                Ok(false) => {
                    tracing::debug!(id = %document.id_repo, "document already indexed, skipping");
                    summary.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(id = %document.id_repo, error = %err, "failed to index document");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch indexed"
        );
        summary
    }

    /// Index one document. Returns `Ok(true)` if created, `Ok(false)` if
    /// its id was already present.
    async fn index_document(&self, document: &RepoDocument) -> Result<bool, GatewayError> {
        document
            .validate()
            .map_err(GatewayError::InvalidDocument)?;

        if self.document_exists(&document.id_repo).await? {
            return Ok(false);
        }

        let path = format!("/collections/{}/documents", self.config.collection);
        let body = document.engine_document();

        let result = with_deadline(self.config.op_deadline(), self.config.op_backoff(), || {
            let url = format!("{}{}", self.config.base_url(), path);
            let body = body.clone();
            async move {
                let response = self
                    .http
                    .post(&url)
                    .header("X-TYPESENSE-API-KEY", &self.config.api_key)
                    .json(&body)
                    .send()
                    .await;
                self.check_json(response).await
            }
        })
        .await;

        match result {
            Ok(_) => Ok(true),
            // Another writer created the same id between our existence
            // check and this create. Treat it as already present.
            Err(GatewayError::Remote { status: 409, body }) => {
                tracing::warn!(id = %document.id_repo, %body, "document created concurrently, skipping");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    // ============ Health ============

    /// Live health probe against the engine, updating the last-known
    /// connectivity flag.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.config.base_url());
        let ok = match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        };
        self.available.store(ok, Ordering::Relaxed);
        ok
    }

    // ============ Request plumbing ============

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let response = self
            .http
            .get(&url)
            .header("X-TYPESENSE-API-KEY", &self.config.api_key)
            .send()
            .await;
        self.check_json(response).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let response = self
            .http
            .post(&url)
            .header("X-TYPESENSE-API-KEY", &self.config.api_key)
            .json(body)
            .send()
            .await;
        self.check_json(response).await
    }

    /// Classify a response into the gateway error taxonomy and record
    /// connectivity: any response at all (even an error status) means the
    /// engine answered, except a 503 which means it did not.
    async fn check_json(
        &self,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<serde_json::Value, GatewayError> {
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.available.store(false, Ordering::Relaxed);
                return Err(err.into());
            }
        };

        let status = response.status();

        if status.as_u16() == 503 {
            self.available.store(false, Ordering::Relaxed);
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(body));
        }

        self.available.store(true, Ordering::Relaxed);

        if status.as_u16() == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::NotFound(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|err| GatewayError::Remote {
            status: status.as_u16(),
            body: format!("invalid JSON body: {}", err),
        })
    }
}

/// The fixed collection schema: every field a string, identity carried in
/// `Id-repo`. Field types and semantics live in the engine, not here.
fn collection_schema(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "fields": [
            { "name": "Id-repo", "type": "string" },
            { "name": "name", "type": "string" },
            { "name": "organisation", "type": "string" },
            { "name": "url", "type": "string" },
            { "name": "website", "type": "string" },
            { "name": "description", "type": "string" },
            { "name": "license", "type": "string" },
            { "name": "latest_update", "type": "string" },
            { "name": "language", "type": "string" },
            { "name": "last_commit", "type": "string" },
            { "name": "open_pull_requests", "type": "string" },
            { "name": "master_branch", "type": "string" },
            { "name": "is_fork", "type": "string" },
            { "name": "forked_from", "type": "string" }
        ]
    })
}
