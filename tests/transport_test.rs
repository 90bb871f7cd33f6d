//! Integration tests for the HTTP transport: retries, rate limiting,
//! circuit breaking, and the response body cap

use reqwest::Method;
use std::time::{Duration, Instant};
use talos::error::TalosError;
use talos::http::Transport;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retries_until_success() {
    let server = MockServer::start().await;

    // Two 500s, then a 200.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("success"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(10, 0, 3, 10).expect("transport");
    let response = transport
        .execute(Method::GET, &server.uri(), &[])
        .await
        .expect("request should succeed after retries");

    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "success");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = Transport::new(10, 2, 0, 10).expect("transport");

    let mut timestamps = Vec::new();
    for _ in 0..5 {
        transport
            .execute(Method::GET, &server.uri(), &[])
            .await
            .expect("request");
        timestamps.push(Instant::now());
    }

    for pair in timestamps.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(400),
            "requests too close together: {gap:?}"
        );
    }
}

#[tokio::test]
async fn circuit_opens_after_consecutive_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = Transport::new(10, 0, 1, 10)
        .expect("transport")
        .with_breaker(10, Duration::from_secs(30));

    for _ in 0..15 {
        let _ = transport.execute(Method::GET, &server.uri(), &[]).await;
    }

    assert!(
        transport.circuit_open(&server.uri()),
        "expected circuit breaker to be open"
    );

    // Ten failed calls at two attempts each; the rest were short-circuited.
    let seen = server.received_requests().await.unwrap().len();
    assert_eq!(seen, 20, "open breaker should not touch the server");

    let err = transport
        .execute(Method::GET, &server.uri(), &[])
        .await
        .expect_err("expected circuit breaker rejection");
    assert!(matches!(err, TalosError::CircuitOpen(_)), "got {err:?}");
}

#[tokio::test]
async fn body_is_capped_without_error() {
    let server = MockServer::start().await;
    let large_body = vec![b'A'; 5 * 1024 * 1024];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(large_body))
        .mount(&server)
        .await;

    let transport = Transport::new(10, 0, 0, 1).expect("transport");
    let response = transport
        .execute(Method::GET, &server.uri(), &[])
        .await
        .expect("capped response is not an error");

    assert!(response.body.len() <= 1024 * 1024);
    assert!(response.truncated);
}

#[tokio::test]
async fn custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::header("X-Api-Key", "sentinel"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(10, 0, 0, 10).expect("transport");
    let headers = vec![("X-Api-Key".to_string(), "sentinel".to_string())];
    let response = transport
        .execute(Method::GET, &server.uri(), &headers)
        .await
        .expect("request");
    assert_eq!(response.status, 200);
}
