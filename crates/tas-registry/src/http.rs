//! HTTP binding of the Registry trait for a remote repository service.
//!
//! Every request carries the configured timeout. Nothing is retried; the
//! caller decides whether to run the workflow again.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use tas_core::{Did, DidDocument, InvokedDidDoc};

use crate::error::{RegistryError, Result};
use crate::traits::Registry;
use crate::types::{DidDocStatus, RoleType, VcMeta, VcStatus};

/// Connection settings for the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8098".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody<T> {
    status: T,
}

/// Registry client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
    /// `<base_url>/api/v1`, the root every endpoint hangs off.
    api: Url,
}

impl HttpRegistry {
    /// Build the client. Construct once and share it.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RegistryError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let api = Url::parse(&format!("{base_url}/api/v1"))
            .map_err(|e| RegistryError::Unavailable(format!("invalid registry URL {base_url}: {e}")))?;
        if api.cannot_be_a_base() {
            return Err(RegistryError::Unavailable(format!(
                "registry URL {base_url} cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url,
            api,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The endpoint under `/api/v1` with each segment percent-encoded, so
    /// ids carrying `/`, `?` or `#` stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RegistryError::Unavailable(format!("registry URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and map transport and status failures.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Timeout(operation.to_string())
            } else {
                RegistryError::Unavailable(format!("{operation}: {e}"))
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(operation, status = status.as_u16(), "registry call failed");
        Err(match status {
            StatusCode::NOT_FOUND => RegistryError::NotFound(operation.to_string()),
            StatusCode::CONFLICT => RegistryError::Conflict(body),
            s if s.is_server_error() => {
                RegistryError::Unavailable(format!("{operation}: HTTP {s}: {body}"))
            }
            s => RegistryError::Rejected {
                operation: operation.to_string(),
                status: s.as_u16(),
                body,
            },
        })
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response, operation: &str) -> Result<T> {
        resp.json::<T>()
            .await
            .map_err(|e| RegistryError::Decode(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn register_did_doc(&self, invoked: &InvokedDidDoc, role: RoleType) -> Result<()> {
        let body = json!({ "invokedDidDoc": invoked, "roleType": role });
        self.send(
            self.client.post(self.url(&["did-docs"])?).json(&body),
            "register_did_doc",
        )
        .await?;
        debug!(controller = %invoked.controller.did, %role, "DID document submitted");
        Ok(())
    }

    async fn find_did_doc(&self, did: &Did, version_id: Option<u64>) -> Result<DidDocument> {
        let mut url = self.url(&["did-docs", did.as_str()])?;
        if let Some(v) = version_id {
            url.query_pairs_mut().append_pair("versionId", &v.to_string());
        }
        let resp = self.send(self.client.get(url), "find_did_doc").await?;
        Self::decode(resp, "find_did_doc").await
    }

    async fn find_did_doc_status(&self, did: &Did) -> Result<DidDocStatus> {
        let resp = self
            .send(
                self.client.get(self.url(&["did-docs", did.as_str(), "status"])?),
                "find_did_doc_status",
            )
            .await?;
        let body: StatusBody<DidDocStatus> = Self::decode(resp, "find_did_doc_status").await?;
        Ok(body.status)
    }

    async fn update_did_doc_status(&self, did: &Did, status: DidDocStatus) -> Result<()> {
        self.send(
            self.client
                .put(self.url(&["did-docs", did.as_str(), "status"])?)
                .json(&json!({ "status": status })),
            "update_did_doc_status",
        )
        .await?;
        Ok(())
    }

    async fn register_vc_meta(&self, meta: &VcMeta) -> Result<()> {
        self.send(
            self.client.post(self.url(&["vc-metas"])?).json(meta),
            "register_vc_meta",
        )
        .await?;
        Ok(())
    }

    async fn find_vc_meta(&self, vc_id: &str) -> Result<VcMeta> {
        let resp = self
            .send(
                self.client.get(self.url(&["vc-metas", vc_id])?),
                "find_vc_meta",
            )
            .await?;
        Self::decode(resp, "find_vc_meta").await
    }

    async fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<()> {
        self.send(
            self.client
                .put(self.url(&["vc-metas", vc_id, "status"])?)
                .json(&json!({ "status": status })),
            "update_vc_status",
        )
        .await?;
        Ok(())
    }
}
