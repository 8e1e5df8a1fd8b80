// tests/http_probes.rs
mod common;
use crate::common::{TestResult, init_tracing, with_timeout};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use probekit::errors::HarnessError;
use probekit::probe::http::client;
use probekit::probe::{Alertmanager, Prometheus, QueryData, get, get_200};
use probekit::retry::RetryPolicy;

/// One canned HTTP response.
#[derive(Clone)]
struct Reply {
    status: &'static str,
    body: String,
    extra_headers: &'static str,
}

impl Reply {
    fn new(status: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            extra_headers: "",
        }
    }
}

/// Serve `replies` in order (the last one repeats) and count requests.
async fn serve(replies: Vec<Reply>) -> std::io::Result<(String, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let reply = replies[n.min(replies.len() - 1)].clone();

            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/json\r\n{}Connection: close\r\n\r\n{}",
                    reply.status,
                    reply.body.len(),
                    reply.extra_headers,
                    reply.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Ok((addr, hits))
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(2), Duration::from_millis(10), Duration::from_millis(50))
        .unwrap()
}

#[tokio::test]
async fn get_200_retries_until_ok() -> TestResult {
    init_tracing();

    let (addr, hits) = serve(vec![
        Reply::new("503 Service Unavailable", "starting"),
        Reply::new("503 Service Unavailable", "starting"),
        Reply::new("200 OK", "ready"),
    ])
    .await?;

    let client = client(true)?;
    let result = with_timeout(get_200(&client, &addr, quick_policy())).await?;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "ready");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn get_200_reports_last_status_and_body() -> TestResult {
    init_tracing();

    let (addr, _) = serve(vec![Reply::new("404 Not Found", "no such service")]).await?;

    let client = client(true)?;
    let policy = RetryPolicy::new(
        Duration::from_millis(100),
        Duration::from_millis(10),
        Duration::from_millis(20),
    )?;
    let err = with_timeout(get_200(&client, &addr, policy)).await.unwrap_err();

    match err {
        HarnessError::RetryExhausted { last_error, .. } => {
            assert!(
                last_error.contains("wanted 200, got 404: no such service"),
                "{last_error}"
            );
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn get_accepts_any_status_and_can_skip_redirects() -> TestResult {
    init_tracing();

    let redirect = Reply {
        extra_headers: "Location: /elsewhere\r\n",
        ..Reply::new("302 Found", "")
    };
    let (addr, _) = serve(vec![redirect]).await?;

    let client = client(false)?;
    let result = with_timeout(get(&client, &addr, RetryPolicy::once())).await?;

    assert_eq!(result.status, 302);
    assert_eq!(
        result.headers.get("location").and_then(|v| v.to_str().ok()),
        Some("/elsewhere")
    );
    Ok(())
}

#[tokio::test]
async fn prometheus_wait_for_data_polls_until_series_appear() -> TestResult {
    init_tracing();

    let empty = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
    let ready = r#"{"status":"success","data":{"resultType":"vector","result":[
        {"metric":{"__name__":"up","job":"console"},"value":[1700000000.0,"1"]}]}}"#;
    let (addr, hits) = serve(vec![Reply::new("200 OK", empty), Reply::new("200 OK", ready)]).await?;

    let prometheus = Prometheus::new(&addr)?;
    let data = with_timeout(prometheus.wait_for_data("up{job=\"console\"}", quick_policy())).await?;

    assert_eq!(data.len(), 1);
    assert!(matches!(data, QueryData::Vector(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn prometheus_no_data_names_the_query() -> TestResult {
    init_tracing();

    let empty = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
    let (addr, _) = serve(vec![Reply::new("200 OK", empty)]).await?;

    let err = with_timeout(Prometheus::new(&addr)?.has_data("absent_metric")).await.unwrap_err();
    assert_eq!(err.to_string(), r#"query "absent_metric" returned 0 results"#);
    Ok(())
}

#[tokio::test]
async fn prometheus_error_body_becomes_query_error() -> TestResult {
    init_tracing();

    let body = r#"{"status":"error","errorType":"bad_data","error":"1:4: parse error"}"#;
    let (addr, _) = serve(vec![Reply::new("400 Bad Request", body)]).await?;

    let err = with_timeout(Prometheus::new(&addr)?.query("up{")).await.unwrap_err();
    assert!(
        matches!(&err, HarnessError::Query { error_type, .. } if error_type == "bad_data"),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn prometheus_non_json_failure_reports_status() -> TestResult {
    init_tracing();

    let (addr, _) = serve(vec![Reply::new("502 Bad Gateway", "upstream down")]).await?;

    let err = with_timeout(Prometheus::new(&addr)?.query("up")).await.unwrap_err();
    assert!(
        matches!(&err, HarnessError::UnexpectedStatus { status: 502, .. }),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn prometheus_has_model_queries_by_model_name() -> TestResult {
    init_tracing();

    let empty = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
    let (addr, _) = serve(vec![Reply::new("200 OK", empty)]).await?;

    let err = with_timeout(Prometheus::new(&addr)?.has_model("cpu_usage")).await.unwrap_err();
    assert_eq!(err.to_string(), r#"query "model{name=\"cpu_usage\"}" returned 0 results"#);
    Ok(())
}

#[tokio::test]
async fn alertmanager_wait_for_alert_polls_until_it_fires() -> TestResult {
    init_tracing();

    let quiet = r#"{"status":"success","data":[]}"#;
    let other = r#"{"status":"success","data":[{"labels":{"alertname":"Watchdog"}}]}"#;
    let firing = r#"{"status":"success","data":[
        {"labels":{"alertname":"Watchdog"}},
        {"labels":{"alertname":"KubePodCrashLooping","severity":"warning"},"status":{"state":"active"}}]}"#;
    let (addr, hits) = serve(vec![
        Reply::new("200 OK", quiet),
        Reply::new("200 OK", other),
        Reply::new("200 OK", firing),
    ])
    .await?;

    let alertmanager = Alertmanager::new(&addr)?;
    let alert = with_timeout(alertmanager.wait_for_alert("KubePodCrashLooping", quick_policy())).await?;

    assert_eq!(alert.labels["severity"], "warning");
    assert_eq!(alert.status.state, "active");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn alertmanager_missing_alert_is_named() -> TestResult {
    init_tracing();

    let (addr, _) = serve(vec![Reply::new("200 OK", r#"{"status":"success","data":[]}"#)]).await?;

    let err = with_timeout(Alertmanager::new(&addr)?.has_alert("Watchdog")).await.unwrap_err();
    assert!(matches!(&err, HarnessError::NoAlert { name } if name == "Watchdog"), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn alertmanager_bad_status_is_reported() -> TestResult {
    init_tracing();

    let (addr, _) = serve(vec![Reply::new("503 Service Unavailable", "not ready")]).await?;

    let err = with_timeout(Alertmanager::new(&addr)?.alerts()).await.unwrap_err();
    assert!(
        matches!(&err, HarnessError::UnexpectedStatus { status: 503, .. }),
        "{err:?}"
    );
    Ok(())
}
