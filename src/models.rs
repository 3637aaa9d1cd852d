//! Core data types flowing through the portal.
//!
//! A [`RepoDocument`] describes one indexed open-source project. The
//! search engine owns all field semantics; locally every field is an
//! opaque string, and the only coercion performed is turning a numeric
//! `open_pull_requests` into its string form at the ingestion boundary.

use serde::{Deserialize, Deserializer, Serialize};

/// One project record as submitted for indexing.
///
/// `Id-repo` determines document identity; submitting a document whose id
/// is already present is a no-op, never an update. All other fields
/// default to the empty string when absent from the uploaded JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDocument {
    #[serde(rename = "Id-repo")]
    pub id_repo: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub latest_update: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub last_commit: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub open_pull_requests: String,
    #[serde(default)]
    pub master_branch: String,
    #[serde(default)]
    pub is_fork: String,
    #[serde(default)]
    pub forked_from: String,
}

impl RepoDocument {
    /// Validate the identity field.
    pub fn validate(&self) -> Result<(), String> {
        if self.id_repo.trim().is_empty() {
            return Err("Id-repo must not be blank".to_string());
        }
        Ok(())
    }

    /// The JSON body sent to the engine: the document's fields plus the
    /// engine primary key `id`, set to `Id-repo`.
    pub fn engine_document(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id_repo,
            "Id-repo": self.id_repo,
            "name": self.name,
            "organisation": self.organisation,
            "url": self.url,
            "website": self.website,
            "description": self.description,
            "license": self.license,
            "latest_update": self.latest_update,
            "language": self.language,
            "last_commit": self.last_commit,
            "open_pull_requests": self.open_pull_requests,
            "master_branch": self.master_branch,
            "is_fork": self.is_fork,
            "forked_from": self.forked_from,
        })
    }
}

/// Accept either a JSON string or a JSON number, storing the string form.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Outcome counts for one indexing batch.
///
/// Per-document failures are logged and counted here; they never abort
/// the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// Documents newly created in the collection.
    pub indexed: usize,
    /// Documents skipped because their id was already present.
    pub skipped: usize,
    /// Documents that failed validation or were rejected by the engine.
    pub failed: usize,
}
