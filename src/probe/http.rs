// src/probe/http.rs

//! HTTP probes: keep GETting a URL until it answers.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, redirect};
use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::retry::{RetryPolicy, wait_until_success};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResult {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Client with per-request timeouts so a hung endpoint costs one attempt,
/// not the whole wait budget.
pub fn client(follow_redirects: bool) -> Result<Client> {
    let policy = if follow_redirects {
        redirect::Policy::default()
    } else {
        redirect::Policy::none()
    };

    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .redirect(policy)
        .build()?;
    Ok(client)
}

/// GET `url` until it answers 200.
///
/// Any other status counts as a failed attempt; the last one is reported as
/// `wanted 200, got <code>: <body>`.
pub async fn get_200(client: &Client, url: &str, policy: RetryPolicy) -> Result<HttpResult> {
    let result = wait_until_success(policy, move || async move {
        let response = fetch(client, url).await?;
        if response.status != 200 {
            return Err(HarnessError::UnexpectedStatus {
                url: url.to_string(),
                expected: 200,
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    })
    .await?;

    Ok(result)
}

/// GET `url` until any response comes back, whatever its status.
///
/// Redirects are followed or not depending on how `client` was built (see
/// [`client`]).
pub async fn get(client: &Client, url: &str, policy: RetryPolicy) -> Result<HttpResult> {
    let result = wait_until_success(policy, move || fetch(client, url)).await?;
    Ok(result)
}

async fn fetch(client: &Client, url: &str) -> Result<HttpResult> {
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.text().await?;

    debug!(url, status, bytes = body.len(), "received response");

    Ok(HttpResult {
        status,
        headers,
        body,
    })
}
