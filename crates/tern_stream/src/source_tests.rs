use std::{sync::Arc, time::Duration};

use httpmock::{Method::GET, MockServer};
use pretty_assertions::assert_eq;
use tern_test::{mock::serve_sse, sse::SseBody};
use test_log::test;
use tokio::sync::mpsc;

use super::*;
use crate::{
    error::Error,
    event::StreamEvent,
    transport::{EventCallback, StreamTransport},
};

fn options() -> OpenOptions {
    OpenOptions {
        sender_id: "user_42".to_owned(),
        correlation_id: "cid-1".to_owned(),
        reconnect: Duration::from_secs(30),
    }
}

fn transport(url: &str) -> (StreamTransport, mpsc::UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event| drop(tx.send(event)));
    let source = HttpEventSource::new(url.parse().unwrap());

    (StreamTransport::new(Arc::new(source), callback), rx)
}

#[test]
fn test_subscription_url() {
    let source = HttpEventSource::new("http://localhost:5005/webhooks/sse/stream".parse().unwrap());

    assert_eq!(
        source.subscription_url(&options()).as_str(),
        "http://localhost:5005/webhooks/sse/stream?sender_id=user_42&cid=cid-1&reconnect_ms=30000"
    );
}

#[test(tokio::test)]
async fn test_stream_events_over_http() {
    let server = MockServer::start_async().await;
    let body = SseBody::new()
        .comment("keep-alive")
        .event("ping", "{}")
        .message("hello")
        .token("Hel")
        .event("token", "lo")
        .event("trace", r#"{"step":"policy"}"#)
        .done()
        .done();

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhooks/sse/stream")
                .query_param("sender_id", "user_42")
                .query_param("cid", "cid-1")
                .query_param("reconnect_ms", "30000");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body.build());
        })
        .await;

    let (mut transport, mut rx) = transport(&server.url("/webhooks/sse/stream"));
    transport.open(&options()).await.unwrap();

    let mut events = vec![];
    while let Some(event) = rx.recv().await {
        if event == StreamEvent::Done {
            break;
        }
        events.push(event);
    }
    transport.close();

    mock.assert_async().await;
    assert_eq!(events, vec![
        StreamEvent::Ping(serde_json::json!({})),
        StreamEvent::UserEcho("hello".to_owned()),
        StreamEvent::Token("Hel".to_owned()),
        StreamEvent::Token("lo".to_owned()),
        StreamEvent::Trace(serde_json::json!({"step": "policy"})),
    ]);

    // The duplicate `done` is never delivered.
    assert!(
        std::iter::from_fn(|| rx.try_recv().ok()).all(|event| event != StreamEvent::Done)
    );
}

#[test(tokio::test)]
async fn test_open_fails_on_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stream");
            then.status(503).body("unavailable");
        })
        .await;

    let (mut transport, _rx) = transport(&server.url("/stream"));
    let result = transport.open(&options()).await;

    assert!(matches!(result, Err(Error::Open(_))), "{result:?}");
    assert!(!transport.is_open());
}

#[test(tokio::test)]
async fn test_open_with_helper_mock() {
    let server = MockServer::start_async().await;
    serve_sse(&server, "/stream", SseBody::new().token("x").done()).await;

    let (mut transport, mut rx) = transport(&server.url("/stream"));
    transport.open(&options()).await.unwrap();

    assert_eq!(rx.recv().await, Some(StreamEvent::Token("x".to_owned())));
    assert_eq!(rx.recv().await, Some(StreamEvent::Done));
}
