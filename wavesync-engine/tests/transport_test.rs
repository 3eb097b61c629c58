use wavesync_engine::{SessionConfig, TransportError, WebSocketTransport, parse_admission};

#[test]
fn test_denial_body_is_read_whatever_the_status() {
    let response = parse_admission(403, r#"{"allowed":false,"reason":"You are banned"}"#).unwrap();
    assert!(!response.allowed);
    assert!(response.is_terminal_denial());

    let response =
        parse_admission(503, r#"{"allowed":false,"reason":"Server at capacity"}"#).unwrap();
    assert!(response.is_terminal_denial());
}

#[test]
fn test_admission_without_usable_body_is_transient() {
    let err = parse_admission(502, "<html>Bad Gateway</html>").unwrap_err();
    assert!(err.contains("502"), "{err}");

    let err = parse_admission(200, "{").unwrap_err();
    assert!(err.contains("malformed"), "{err}");
}

#[test]
fn test_allowed_reply() {
    let response = parse_admission(200, r#"{"allowed":true}"#).unwrap();
    assert!(response.allowed);
    assert!(response.reason.is_empty());
}

#[test]
fn test_urls_follow_server_scheme() {
    let (net_tx, _net_rx) = flume::unbounded();
    let config = SessionConfig {
        server_url: "https://sdr.example.net/receiver".to_string(),
        session_id: "abc 1".to_string(),
        ..SessionConfig::default()
    };
    let transport = WebSocketTransport::new(&config, net_tx).unwrap();

    assert_eq!(
        transport.admission_url().as_str(),
        "https://sdr.example.net/receiver/connection"
    );
    assert_eq!(
        transport.stream_url().as_str(),
        "wss://sdr.example.net/receiver/ws/user-spectrum?user_session_id=abc+1"
    );
}

#[test]
fn test_invalid_server_url_is_rejected() {
    let (net_tx, _net_rx) = flume::unbounded();
    let config = SessionConfig {
        server_url: "not a url".to_string(),
        ..SessionConfig::default()
    };
    assert!(matches!(
        WebSocketTransport::new(&config, net_tx),
        Err(TransportError::InvalidUrl { .. })
    ));
}
