use crate::base::neterror::NetError;
use std::io;
use tokio_tungstenite::tungstenite;

#[test]
fn test_net_error_codes() {
    assert_eq!(NetError::ConnectionClosed.as_i32(), -100);
    assert_eq!(NetError::TimedOut.as_i32(), -118);
    assert_eq!(NetError::handshake("bad upgrade").as_i32(), -173);
    assert_eq!(NetError::InvalidUrl.as_i32(), -300);
}

#[test]
fn test_timeout_classification() {
    assert!(NetError::TimedOut.is_timeout());
    assert!(NetError::Io(io::Error::from(io::ErrorKind::TimedOut)).is_timeout());
    assert!(!NetError::ConnectionClosed.is_timeout());
    assert!(!NetError::handshake("x").is_timeout());
}

#[test]
fn test_engine_error_mapping() {
    let err = NetError::from(tungstenite::Error::ConnectionClosed);
    assert!(matches!(err, NetError::ConnectionClosed));

    let err = NetError::from(tungstenite::Error::AlreadyClosed);
    assert!(matches!(err, NetError::ConnectionClosed));

    let err = NetError::from(tungstenite::Error::Io(io::Error::from(
        io::ErrorKind::ConnectionReset,
    )));
    assert!(matches!(err, NetError::ConnectionReset));

    let err = NetError::from(tungstenite::Error::Io(io::Error::from(io::ErrorKind::TimedOut)));
    assert!(err.is_timeout());
}

#[test]
fn test_rejected_upgrade_keeps_status() {
    let resp = http::Response::builder()
        .status(403)
        .body(None)
        .unwrap();
    let err = NetError::from(tungstenite::Error::Http(resp));
    assert!(err.is_handshake());
    assert_eq!(err.handshake_status(), Some(http::StatusCode::FORBIDDEN));
}

#[test]
fn test_io_error_bridge() {
    let err: io::Error = NetError::TimedOut.into();
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    let inner = err.get_ref().and_then(|e| e.downcast_ref::<NetError>());
    assert!(matches!(inner, Some(NetError::TimedOut)));

    let err: io::Error = NetError::ConnectionClosed.into();
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);

    // Plain io errors pass through untouched.
    let err: io::Error = NetError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")).into();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert!(err.get_ref().and_then(|e| e.downcast_ref::<NetError>()).is_none());
}
