//! Retry, classification and credential handling against a scripted server.

mod common;

use common::*;
use serde_json::{json, Value};
use std::time::Duration;

use dukan_client::{ApiRequest, ClientError, RetryPolicy};

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1000))
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_with_doubling_delay() {
    let transport = ScriptedTransport::new(vec![status(503), status(503), ok(json!({"id": "x"}))]);
    let tokens = CountingTokenStore::with_token("t");
    let client = client(transport.clone(), tokens, policy());

    let value: Value = client.call(&ApiRequest::get("ping")).await.unwrap();

    assert_eq!(value, json!({"id": "x"}));
    assert_eq!(transport.calls().len(), 3);
    assert_eq!(
        transport.gaps(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[tokio::test(start_paused = true)]
async fn not_found_is_never_retried() {
    let transport = ScriptedTransport::new(vec![json(404, json!({"message": "no such item"}))]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let err = client.call::<Value>(&ApiRequest::get("items/x/batches")).await.unwrap_err();

    assert!(matches!(err, ClientError::Validation { status: 404, .. }));
    assert_eq!(err.to_string(), "Request rejected (404): no such item");
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_clears_token_once() {
    let transport = ScriptedTransport::new(vec![status(401), ok(json!(null))]);
    let tokens = CountingTokenStore::with_token("secret");
    let client = client(transport.clone(), tokens.clone(), policy());

    let err = client.call::<Value>(&ApiRequest::get("day-cycles/current")).await.unwrap_err();

    assert!(err.is_auth_error());
    assert_eq!(tokens.clears(), 1);
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].token.as_deref(), Some("secret"));

    // next call goes out without a credential
    let _ = client.call::<Value>(&ApiRequest::get("day-cycles/current")).await;
    assert_eq!(transport.calls()[1].token, None);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_last_error() {
    let transport = ScriptedTransport::new(vec![
        status(503),
        status(502),
        status(504),
        json(503, json!({"message": "still down"})),
    ]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let err = client.call::<Value>(&ApiRequest::get("ping")).await.unwrap_err();

    match err {
        ClientError::Http { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "still down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.calls().len(), 4);
    assert_eq!(
        transport.gaps(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn network_failure_is_retried() {
    let transport = ScriptedTransport::new(vec![network_down(), ok(json!([1, 2]))]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let value: Vec<u32> = client.call(&ApiRequest::get("ping")).await.unwrap();

    assert_eq!(value, vec![1, 2]);
    assert_eq!(transport.gaps(), vec![Duration::from_millis(1000)]);
}

#[tokio::test(start_paused = true)]
async fn envelope_failure_is_not_retried() {
    let transport = ScriptedTransport::new(vec![json(
        200,
        json!({"success": false, "code": "DAY_CLOSED", "message": "Open the day first"}),
    )]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let err = client.call::<Value>(&ApiRequest::get("ping")).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { ref code, .. } if code.as_deref() == Some("DAY_CLOSED")));
    assert_eq!(err.user_message(), "Open the day first");
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stock_conflict_is_not_retried() {
    let transport = ScriptedTransport::new(vec![json(409, json!({"message": "ITM-1 short by 2"}))]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let err = client.call::<Value>(&ApiRequest::get("ping")).await.unwrap_err();

    assert!(matches!(err, ClientError::StockConflict(_)));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn per_call_policy_overrides_default() {
    let transport = ScriptedTransport::new(vec![status(500), status(500), ok(json!(1))]);
    let client = client(transport.clone(), CountingTokenStore::with_token("t"), policy());

    let err = client
        .call_with::<Value>(&ApiRequest::get("ping"), RetryPolicy::no_retry())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(transport.calls().len(), 1);

    let value: u32 = client
        .call_with(&ApiRequest::get("ping"), RetryPolicy::new(1, Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(value, 1);
    assert_eq!(transport.gaps()[1], Duration::from_millis(50));
}
