// src/probe/alertmanager.rs

//! Alertmanager v1 API client: which alerts are active right now.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::retry::{RetryPolicy, wait_until_success};

/// Body of `GET /api/v1/alerts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AlertsResponse {
    Success {
        #[serde(default)]
        data: Vec<Alert>,
    },
    Error {
        #[serde(rename = "errorType", default)]
        error_type: String,
        #[serde(default)]
        error: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// RFC 3339, as sent.
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    #[serde(rename = "generatorURL")]
    pub generator_url: Option<String>,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default)]
    pub receivers: Vec<String>,
    #[serde(default)]
    pub fingerprint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub silenced_by: Vec<String>,
    #[serde(default)]
    pub inhibited_by: Vec<String>,
}

impl AlertsResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| HarnessError::Decode {
            what: "alertmanager alerts response",
            source,
        })
    }
}

impl Alert {
    /// The `alertname` label.
    pub fn name(&self) -> Option<&str> {
        self.labels.get("alertname").map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Alertmanager {
    base_url: String,
    client: Client,
}

impl Alertmanager {
    /// `base_url` is the server root, e.g. `<console>/service/alertmanager`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(base_url, super::http::client(true)?))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every alert Alertmanager currently knows about.
    pub async fn alerts(&self) -> Result<Vec<Alert>> {
        let url = format!("{}/api/v1/alerts", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(HarnessError::UnexpectedStatus {
                url,
                expected: 200,
                status: status.as_u16(),
                body,
            });
        }

        match AlertsResponse::from_json(&body)? {
            AlertsResponse::Success { data } => {
                debug!(alerts = data.len(), "fetched alerts");
                Ok(data)
            }
            AlertsResponse::Error { error_type, error } => {
                Err(HarnessError::Alerts { error_type, error })
            }
        }
    }

    /// The first alert whose `alertname` is `name`.
    pub async fn has_alert(&self, name: &str) -> Result<Alert> {
        self.alerts()
            .await?
            .into_iter()
            .find(|alert| alert.name() == Some(name))
            .ok_or_else(|| HarnessError::NoAlert {
                name: name.to_string(),
            })
    }

    /// Poll [`has_alert`](Self::has_alert) until the alert fires.
    pub async fn wait_for_alert(&self, name: &str, policy: RetryPolicy) -> Result<Alert> {
        let alert = wait_until_success(policy, || self.has_alert(name)).await?;
        Ok(alert)
    }
}
