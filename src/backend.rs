//! Read access to the hosted `places` table over its REST interface.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendConfig;

/// The one failure kind a read can produce. Network, auth and query errors
/// are not told apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote read of `{table}` failed: {reason}")]
pub struct ProbeError {
    pub table: String,
    pub reason: String,
}

impl ProbeError {
    pub fn new(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

/// A remote record collection that can be read from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn select(&self, table: &str, columns: &str, limit: usize) -> Result<Value, ProbeError>;
}

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(cfg: &BackendConfig) -> anyhow::Result<Self> {
        let headers = match cfg.api_key.as_deref() {
            Some(key) => auth_headers(key)?,
            None => {
                tracing::warn!("no backend key configured; requests will be anonymous");
                HeaderMap::new()
            }
        };

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(RestClient {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

/// `apikey` and bearer headers, marked sensitive so the key stays out of
/// debug output.
fn auth_headers(key: &str) -> anyhow::Result<HeaderMap> {
    let mut apikey = HeaderValue::from_str(key)?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

#[async_trait]
impl RecordSource for RestClient {
    async fn select(&self, table: &str, columns: &str, limit: usize) -> Result<Value, ProbeError> {
        let url = self.table_url(table);
        tracing::debug!("GET {} select={} limit={}", url, columns, limit);

        let response = self
            .http
            .get(&url)
            .query(&[("select", columns.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| ProbeError::new(table, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::new(table, format!("HTTP {}: {}", status, body.trim())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProbeError::new(table, e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ProbeError::new(table, e.to_string()))
    }
}
