//! HTTP implementation of the bulk import API

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{BulkImportApi, CreateOptions, ErrorRecords, JobHandle, SessionSummary};
use crate::config::Config;
use crate::error::{BulkImportError, Result};
use crate::prepare::PartDecoder;

/// User-Agent header value
const USER_AGENT: &str = concat!("td-bulk-import/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ListResponse {
    bulk_imports: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
struct ListPartsResponse {
    parts: Vec<String>,
}

/// Bulk import client talking to the REST API
pub struct HttpClient {
    endpoint: Url,
    api_key: String,
    client: Client,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            BulkImportError::Config(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(BulkImportError::Config(format!(
                "invalid endpoint '{}'",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Build `/v3/bulk_import/<segments...>` with every segment percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v3", "bulk_import"])
                .extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!("{} {} (request id {})", method, url, request_id);

        self.client
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("X-Request-Id", request_id)
            .header("Authorization", format!("TD1 {}", self.api_key))
    }

    /// Send and map non-success statuses to errors
    async fn send(&self, request: RequestBuilder, target: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 404 {
            return Err(BulkImportError::NotFound(target.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(text);

        Err(BulkImportError::Api {
            status: status.as_u16(),
            message: format!("{}: {}", target, message),
        })
    }

    async fn post(&self, segments: &[&str], target: &str) -> Result<Response> {
        let request = self.request(Method::POST, self.url(segments));
        self.send(request, target).await
    }
}

fn session_target(name: &str) -> String {
    format!("Bulk import session '{}'", name)
}

fn part_target(session: &str, part: &str) -> String {
    format!("Part '{}' of bulk import session '{}'", part, session)
}

#[async_trait]
impl BulkImportApi for HttpClient {
    async fn list_bulk_imports(&self) -> Result<Vec<SessionSummary>> {
        let request = self.request(Method::GET, self.url(&["list"]));
        let response = self.send(request, "Bulk import list").await?;
        let list: ListResponse = response.json().await?;
        Ok(list.bulk_imports)
    }

    async fn create_bulk_import(
        &self,
        name: &str,
        database: &str,
        table: &str,
        options: &CreateOptions,
    ) -> Result<()> {
        let mut request = self.request(Method::POST, self.url(&["create", name, database, table]));
        if let Some(org) = &options.organization {
            request = request.form(&[("organization", org.as_str())]);
        }

        let target = format!("Table '{}.{}'", database, table);
        self.send(request, &target).await?;
        Ok(())
    }

    async fn delete_bulk_import(&self, name: &str) -> Result<()> {
        self.post(&["delete", name], &session_target(name)).await?;
        Ok(())
    }

    async fn list_bulk_import_parts(&self, name: &str) -> Result<Vec<String>> {
        let request = self.request(Method::GET, self.url(&["list_parts", name]));
        let response = self.send(request, &session_target(name)).await?;
        let list: ListPartsResponse = response.json().await?;
        Ok(list.parts)
    }

    async fn upload_part(
        &self,
        session: &str,
        part: &str,
        body: tokio::fs::File,
        size: u64,
    ) -> Result<()> {
        let request = self
            .request(Method::PUT, self.url(&["upload_part", session, part]))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(Body::from(body));

        self.send(request, &part_target(session, part)).await?;
        Ok(())
    }

    async fn delete_part(&self, session: &str, part: &str) -> Result<()> {
        self.post(&["delete_part", session, part], &part_target(session, part))
            .await?;
        Ok(())
    }

    async fn perform_bulk_import(&self, name: &str) -> Result<JobHandle> {
        let response = self.post(&["perform", name], &session_target(name)).await?;
        Ok(response.json().await?)
    }

    async fn commit_bulk_import(&self, name: &str) -> Result<JobHandle> {
        let response = self.post(&["commit", name], &session_target(name)).await?;
        Ok(response.json().await?)
    }

    async fn freeze_bulk_import(&self, name: &str) -> Result<()> {
        self.post(&["freeze", name], &session_target(name)).await?;
        Ok(())
    }

    async fn unfreeze_bulk_import(&self, name: &str) -> Result<()> {
        self.post(&["unfreeze", name], &session_target(name)).await?;
        Ok(())
    }

    async fn error_records(&self, name: &str) -> Result<ErrorRecords> {
        let request = self.request(Method::GET, self.url(&["error_records", name]));
        let response = self.send(request, &session_target(name)).await?;
        let bytes = response.bytes().await?;
        Ok(PartDecoder::new(Cursor::new(bytes.to_vec())))
    }
}
