// src/probe/prometheus.rs

//! Minimal Prometheus HTTP API client for "is this metric there yet" checks.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::retry::{RetryPolicy, wait_until_success};

/// Body of `GET /api/v1/query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryResponse {
    Success {
        data: QueryData,
        #[serde(default)]
        warnings: Vec<String>,
    },
    Error {
        #[serde(rename = "errorType")]
        error_type: String,
        error: String,
    },
}

/// Query result, tagged by `resultType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Vector(Vec<VectorSample>),
    Matrix(Vec<MatrixSeries>),
    Scalar(SamplePoint),
    String(SamplePoint),
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub value: SamplePoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub values: Vec<SamplePoint>,
}

/// `[<unix seconds>, "<value>"]`. Values stay strings on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplePoint(pub f64, pub String);

impl QueryResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| HarnessError::Decode {
            what: "prometheus query response",
            source,
        })
    }
}

impl QueryData {
    /// Number of series (vector/matrix); scalars and strings count as one.
    pub fn len(&self) -> usize {
        match self {
            QueryData::Vector(samples) => samples.len(),
            QueryData::Matrix(series) => series.len(),
            QueryData::Scalar(_) | QueryData::String(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Prometheus {
    base_url: String,
    client: Client,
}

impl Prometheus {
    /// `base_url` is the server root, e.g. `<console>/service/prometheus`.
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

    /// Run an instant query.
    pub async fn query(&self, query: &str) -> Result<QueryData> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // Failed queries come back as 4xx/5xx with an error body; anything
        // else that does not decode is reported as the bad status it is.
        let parsed = match QueryResponse::from_json(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(HarnessError::UnexpectedStatus {
                    url,
                    expected: 200,
                    status: status.as_u16(),
                    body,
                });
            }
            Err(err) => return Err(err),
        };

        match parsed {
            QueryResponse::Success { data, warnings } => {
                for warning in &warnings {
                    debug!(query, warning = %warning, "prometheus warning");
                }
                Ok(data)
            }
            QueryResponse::Error { error_type, error } => Err(HarnessError::Query {
                query: query.to_string(),
                error_type,
                error,
            }),
        }
    }

    /// Run `query` and fail unless it returned at least one result.
    pub async fn has_data(&self, query: &str) -> Result<QueryData> {
        let data = self.query(query).await?;
        if data.is_empty() {
            return Err(HarnessError::NoData {
                query: query.to_string(),
            });
        }
        debug!(query, results = data.len(), "query has data");
        Ok(data)
    }

    /// Series exist for the console model called `name`.
    pub async fn has_model(&self, name: &str) -> Result<QueryData> {
        self.has_data(&format!("model{{name=\"{name}\"}}")).await
    }

    /// Poll [`has_data`](Self::has_data) until it succeeds.
    pub async fn wait_for_data(&self, query: &str, policy: RetryPolicy) -> Result<QueryData> {
        let data = wait_until_success(policy, || self.has_data(query)).await?;
        Ok(data)
    }
}
