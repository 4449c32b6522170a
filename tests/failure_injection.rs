//! Failure paths: transport loss, dial failures, packaging errors,
//! double close, contract violations.

mod common;

use bytes::Bytes;
use common::*;
use secure_stream::{
    SecureStream, SessionError, SessionEvent, Transport, WriteError,
};
use tokio::net::TcpListener;

#[tokio::test]
async fn transport_close_mid_handshake_closes_cleanly() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));
    assert_eq!(&expect_outbound(&mut handle).await[..], CLIENT_HELLO);

    handle.close();

    // Clean close, no Secure event, no error.
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Close));
    assert!(stream.next_event().await.is_none());
}

#[tokio::test]
async fn dial_failure_surfaces_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut stream = SecureStream::connect("127.0.0.1", port, options());
    match expect_event(&mut stream).await {
        SessionEvent::Error(SessionError::Transport(_)) => {}
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert!(stream.next_event().await.is_none());
}

#[tokio::test]
async fn packaging_failure_is_local_to_the_write() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));
    assert_eq!(&expect_outbound(&mut handle).await[..], CLIENT_HELLO);
    handle.deliver(server_hello("example.com"));
    assert_eq!(&expect_outbound(&mut handle).await[..], FINISHED);
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Secure));

    let poisoned = stream.write(Bytes::from_static(b"poison"));
    assert!(matches!(
        poisoned.completion().await,
        Err(WriteError::Packaging(_))
    ));

    // The session stays usable in both directions.
    stream.write(Bytes::from_static(b"fine")).completion().await.unwrap();
    assert_eq!(&expect_outbound(&mut handle).await[..], b"REC fine");

    handle.deliver(record("still-alive"));
    match expect_event(&mut stream).await {
        SessionEvent::Data(bytes) => assert_eq!(&bytes[..], b"still-alive"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn queued_write_fails_when_closed_before_secure() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));

    let receipt = stream.write(Bytes::from_static(b"never-sent"));
    stream.close();

    assert!(matches!(
        receipt.completion().await,
        Err(WriteError::SessionClosed)
    ));
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Close));
}

#[tokio::test]
async fn close_is_idempotent_and_emits_one_terminal_event() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));
    assert_eq!(&expect_outbound(&mut handle).await[..], CLIENT_HELLO);
    handle.deliver(server_hello("example.com"));
    assert_eq!(&expect_outbound(&mut handle).await[..], FINISHED);
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Secure));

    stream.close();
    stream.close();

    // One close alert, one Close event, then the stream ends.
    assert_eq!(&expect_outbound(&mut handle).await[..], CLOSE_NOTIFY);
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Close));
    assert!(stream.next_event().await.is_none());
    settle().await;
    assert!(handle.try_next_outbound().is_none());
}

#[tokio::test]
async fn write_after_terminal_fails_not_writable() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));
    stream.close();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Close));
    assert!(stream.next_event().await.is_none());

    let late = stream.write(Bytes::from_static(b"late"));
    assert!(matches!(
        late.completion().await,
        Err(WriteError::NotWritable)
    ));
}

#[tokio::test]
async fn peer_close_ends_the_readable_side() {
    let (transport, mut handle) = Transport::channel();
    let mut stream =
        SecureStream::wrap_with_engine(transport, options(), MockEngine::factory(accept_all()))
            .unwrap();

    handle.open();
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Connect));
    handle.deliver(server_hello("example.com"));
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Secure));

    handle.deliver(record("last-words"));
    handle.deliver(&CLOSE_NOTIFY[..]);

    match expect_event(&mut stream).await {
        SessionEvent::Data(bytes) => assert_eq!(&bytes[..], b"last-words"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(expect_event(&mut stream).await, SessionEvent::Close));
}

#[tokio::test]
async fn wrapping_an_encrypted_transport_fails_fast() {
    let (mut transport, _handle) = Transport::channel();
    transport.encrypted = true;

    let err = SecureStream::wrap_with_engine(
        transport,
        options(),
        MockEngine::factory(accept_all()),
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::AlreadySecure));
}
