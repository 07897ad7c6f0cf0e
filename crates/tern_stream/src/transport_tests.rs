use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_log::test;
use tokio::sync::mpsc;

use super::*;
use crate::mock::{MockConnection, MockSource};

fn transport(source: &MockSource) -> (StreamTransport, mpsc::UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event| drop(tx.send(event)));

    (StreamTransport::new(Arc::new(source.clone()), callback), rx)
}

async fn released(connection: &MockConnection) -> bool {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !connection.is_released() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .is_ok()
}

#[test(tokio::test)]
async fn test_open_resolves_when_ready() {
    let source = MockSource::new();
    let (mut transport, _rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    assert!(!transport.is_open());

    source.connection(0).open();
    opening.await.unwrap();

    assert!(transport.is_open());
    assert_eq!(source.connection(0).options().sender_id, "user_1");
}

#[test(tokio::test)]
async fn test_open_fails_before_ready() {
    let source = MockSource::new();
    let (mut transport, _rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    source.connection(0).error("connection refused");

    assert_eq!(
        opening.await,
        Err(Error::Open("connection refused".to_owned()))
    );
    assert!(!transport.is_open());
    assert!(released(&source.connection(0)).await);
}

#[test(tokio::test)]
async fn test_open_fails_when_connect_is_refused() {
    let source = MockSource::new();
    source.refuse("bad url");
    let (mut transport, _rx) = transport(&source);

    let result = transport.open(&OpenOptions::new("user_1")).await;

    assert_matches!(result, Err(Error::Open(reason)) if reason == "bad url");
}

#[test(tokio::test)]
async fn test_errors_after_open_are_forwarded() {
    let source = MockSource::new();
    let (mut transport, mut rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    let connection = source.connection(0);
    connection.open();
    opening.await.unwrap();

    connection.error("connection reset");
    connection.open();
    connection.token("still here");

    assert_eq!(
        rx.recv().await,
        Some(StreamEvent::TransportError("connection reset".to_owned()))
    );
    assert_eq!(
        rx.recv().await,
        Some(StreamEvent::Token("still here".to_owned()))
    );
    assert!(transport.is_open());
}

#[test(tokio::test)]
async fn test_done_is_delivered_once() {
    let source = MockSource::new();
    let (mut transport, mut rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    let connection = source.connection(0);
    connection.open();
    opening.await.unwrap();

    connection.done();
    connection.done();
    connection.echo("after");

    assert_eq!(rx.recv().await, Some(StreamEvent::Done));
    assert_eq!(
        rx.recv().await,
        Some(StreamEvent::UserEcho("after".to_owned()))
    );
}

#[test(tokio::test)]
async fn test_message_implies_ready() {
    let source = MockSource::new();
    let (mut transport, mut rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    source.connection(0).token("a");

    opening.await.unwrap();
    assert_eq!(rx.recv().await, Some(StreamEvent::Token("a".to_owned())));
}

#[test(tokio::test)]
async fn test_close_is_idempotent() {
    let source = MockSource::new();
    let (mut transport, _rx) = transport(&source);

    // Never opened.
    transport.close();
    transport.close();

    let opening = transport.open(&OpenOptions::new("user_1"));
    source.connection(0).open();
    opening.await.unwrap();

    transport.close();
    transport.close();

    assert!(!transport.is_open());
    assert!(released(&source.connection(0)).await);
}

#[test(tokio::test)]
async fn test_close_while_opening() {
    let source = MockSource::new();
    let (mut transport, _rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    transport.close();

    assert_eq!(opening.await, Err(Error::Closed));
    assert!(released(&source.connection(0)).await);
}

#[test(tokio::test)]
async fn test_no_events_after_close() {
    let source = MockSource::new();
    let (mut transport, mut rx) = transport(&source);

    let opening = transport.open(&OpenOptions::new("user_1"));
    let connection = source.connection(0);
    connection.open();
    opening.await.unwrap();

    connection.token("a");
    assert_eq!(rx.recv().await, Some(StreamEvent::Token("a".to_owned())));

    transport.close();
    connection.token("b");
    connection.done();
    tokio::task::yield_now().await;

    assert!(rx.try_recv().is_err());
}

#[test(tokio::test)]
async fn test_reopen_releases_previous_subscription() {
    let source = MockSource::new();
    let (mut transport, _rx) = transport(&source);

    let first = transport.open(&OpenOptions::new("user_1"));
    let second = transport.open(&OpenOptions::new("user_1"));

    assert_eq!(first.await, Err(Error::Closed));
    assert!(released(&source.connection(0)).await);

    source.connection(1).open();
    second.await.unwrap();
    assert_ne!(
        source.connection(0).options().correlation_id,
        source.connection(1).options().correlation_id
    );
}
