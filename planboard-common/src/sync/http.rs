//! HTTP document-store transport
//!
//! Speaks the JSONBin-style protocol:
//! - `PUT {base}/{bin}` replaces the document
//! - `GET {base}/{bin}/latest` returns `{"record": document}`
//! - `POST {base}` creates a new bin and returns its id in `metadata.id`
//!
//! An optional master key is sent as `X-Master-Key`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{SyncDocument, SyncTransport};
use crate::{Error, Result};

/// Per-request timeout bounding every in-flight sync call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("planboard/", env!("CARGO_PKG_VERSION"));
const MASTER_KEY_HEADER: &str = "X-Master-Key";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    record: Option<SyncDocument>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    metadata: Option<CreateMetadata>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateMetadata {
    id: String,
}

/// JSONBin-style document store client
pub struct HttpDocumentTransport {
    client: Client,
    base_url: String,
    bin_id: String,
    api_key: Option<String>,
}

impl HttpDocumentTransport {
    /// Client for an existing bin
    pub fn new(base_url: &str, bin_id: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        if bin_id.trim().is_empty() {
            return Err(Error::Config("sync bin id must not be empty".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bin_id: bin_id.trim().to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Create a new bin seeded with `initial` and return a client for it
    pub async fn create_bin(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        initial: &SyncDocument,
    ) -> Result<Self> {
        let client = build_client(timeout)?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let api_key = api_key.filter(|k| !k.is_empty());

        let mut request = client.post(&base_url).json(initial);
        if let Some(key) = &api_key {
            request = request.header(MASTER_KEY_HEADER, key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "POST {} returned HTTP {}",
                base_url, status
            )));
        }

        let created: CreateResponse = response.json().await?;
        let bin_id = created
            .metadata
            .map(|m| m.id)
            .or(created.id)
            .ok_or_else(|| Error::Transport("bin creation response carried no id".to_string()))?;

        info!("Created sync bin {}", bin_id);
        Ok(Self {
            client,
            base_url,
            bin_id,
            api_key,
        })
    }

    pub fn bin_id(&self) -> &str {
        &self.bin_id
    }

    fn bin_url(&self) -> String {
        format!("{}/{}", self.base_url, self.bin_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(MASTER_KEY_HEADER, key),
            None => request,
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl SyncTransport for HttpDocumentTransport {
    async fn push(&self, document: &SyncDocument) -> Result<()> {
        let url = self.bin_url();
        let response = self
            .authorize(self.client.put(&url))
            .header("X-Bin-Versioning", "false")
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("PUT {} returned HTTP {}", url, status)));
        }
        debug!("Pushed document stamp {} to {}", document.last_update, url);
        Ok(())
    }

    async fn pull(&self) -> Result<Option<SyncDocument>> {
        let url = format!("{}/latest", self.bin_url());
        let response = self.authorize(self.client.get(&url)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("GET {} returned HTTP {}", url, status)));
        }

        let latest: LatestResponse = response.json().await?;
        Ok(latest.record)
    }

    fn describe(&self) -> String {
        format!("http {}", self.bin_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bin_rejected() {
        let result = HttpDocumentTransport::new("http://localhost", "  ", None, DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_describe_normalizes_base() {
        let transport =
            HttpDocumentTransport::new("http://localhost:9/b/", "abc", Some(String::new()), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(transport.describe(), "http http://localhost:9/b/abc");
        assert!(transport.api_key.is_none());
    }

    #[test]
    fn test_latest_response_shapes() {
        let with_record: LatestResponse =
            serde_json::from_str(r#"{"record": {"lastUpdate": 42, "updatedBy": "bob"}, "metadata": {}}"#).unwrap();
        let record = with_record.record.unwrap();
        assert_eq!(record.last_update, 42);
        assert_eq!(record.updated_by, "bob");

        let empty: LatestResponse = serde_json::from_str(r#"{"record": null}"#).unwrap();
        assert!(empty.record.is_none());
    }
}
