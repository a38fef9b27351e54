//! Bulk import API - the remote operations the uploader depends on

mod http;

use std::io::Cursor;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

pub use http::HttpClient;

use crate::error::{BulkImportError, Result};
use crate::prepare::PartDecoder;

/// One bulk import session as reported by the list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub upload_frozen: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub valid_records: Option<u64>,
    #[serde(default)]
    pub error_records: Option<u64>,
    #[serde(default)]
    pub valid_parts: Option<u64>,
    #[serde(default)]
    pub error_parts: Option<u64>,
    #[serde(default)]
    pub organization: Option<String>,
}

/// Job queued by perform or commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(deserialize_with = "required_string_or_number")]
    pub job_id: String,
}

/// Extra settings for session creation
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub organization: Option<String>,
}

/// Records the service rejected while performing a session
pub type ErrorRecords = PartDecoder<Cursor<Vec<u8>>>;

/// Remote bulk import operations
#[async_trait]
pub trait BulkImportApi: Send + Sync {
    async fn list_bulk_imports(&self) -> Result<Vec<SessionSummary>>;

    /// Look a session up by name
    async fn show_bulk_import(&self, name: &str) -> Result<SessionSummary> {
        self.list_bulk_imports()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| BulkImportError::NotFound(format!("Bulk import session '{}'", name)))
    }

    async fn create_bulk_import(
        &self,
        name: &str,
        database: &str,
        table: &str,
        options: &CreateOptions,
    ) -> Result<()>;

    /// Fails with `NotFound` when the session does not exist
    async fn delete_bulk_import(&self, name: &str) -> Result<()>;

    async fn list_bulk_import_parts(&self, name: &str) -> Result<Vec<String>>;

    /// Upload `size` bytes read from `body` as part `part` of `session`
    async fn upload_part(
        &self,
        session: &str,
        part: &str,
        body: tokio::fs::File,
        size: u64,
    ) -> Result<()>;

    async fn delete_part(&self, session: &str, part: &str) -> Result<()>;

    async fn perform_bulk_import(&self, name: &str) -> Result<JobHandle>;

    async fn commit_bulk_import(&self, name: &str) -> Result<JobHandle>;

    async fn freeze_bulk_import(&self, name: &str) -> Result<()>;

    async fn unfreeze_bulk_import(&self, name: &str) -> Result<()>;

    async fn error_records(&self, name: &str) -> Result<ErrorRecords>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

fn required_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}
