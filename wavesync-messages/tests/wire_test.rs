use serde_json::json;
use wavesync_messages::{
    AdmissionRequest, AdmissionResponse, ClientCommand, Hertz, ServerMessage,
};

#[test]
fn test_pan_carries_only_an_integer_frequency() {
    let pan = ClientCommand::Pan {
        frequency: Hertz::round_from(7_074_000.6),
    };
    let value = serde_json::to_value(&pan).unwrap();
    assert_eq!(value, json!({"type": "pan", "frequency": 7_074_001}));
}

#[test]
fn test_zoom_and_status_wire_names() {
    let zoom = ClientCommand::Zoom {
        frequency: Hertz::mhz(14),
        bin_bandwidth: 50.0,
    };
    assert_eq!(
        serde_json::to_value(&zoom).unwrap(),
        json!({"type": "zoom", "frequency": 14_000_000, "binBandwidth": 50.0})
    );
    assert_eq!(
        serde_json::to_value(ClientCommand::GetStatus).unwrap(),
        json!({"type": "get_status"})
    );
    assert_eq!(
        serde_json::to_value(ClientCommand::Reset).unwrap(),
        json!({"type": "reset"})
    );
}

#[test]
fn test_config_echo_parses_camel_case() {
    let raw = r#"{"type":"config","centerFreq":15000000,"binCount":1024,"binBandwidth":29296.875,"totalBandwidth":30000000}"#;
    match serde_json::from_str::<ServerMessage>(raw).unwrap() {
        ServerMessage::Config(echo) => {
            let view = echo.view();
            assert_eq!(view.center_frequency, 15_000_000.0);
            assert_eq!(view.bin_count, 1024);
            assert_eq!(view.total_bandwidth(), 30_000_000.0);
        }
        other => panic!("Expected config, got {:?}", other),
    }
}

#[test]
fn test_spectrum_null_bins_become_nan() {
    let raw = r#"{"type":"spectrum","data":[-90.5,null,-80],"timestamp":1000,"frequency":7000000}"#;
    match serde_json::from_str::<ServerMessage>(raw).unwrap() {
        ServerMessage::Spectrum(payload) => {
            assert_eq!(payload.data.len(), 3);
            assert_eq!(payload.data[0], -90.5);
            assert!(payload.data[1].is_nan());
            assert_eq!(payload.data[2], -80.0);
        }
        other => panic!("Expected spectrum, got {:?}", other),
    }
}

#[test]
fn test_error_and_pong() {
    let raw = r#"{"type":"error","status":429,"error":"slow down"}"#;
    match serde_json::from_str::<ServerMessage>(raw).unwrap() {
        ServerMessage::Error(err) => assert!(err.is_rate_limit()),
        other => panic!("Expected error, got {:?}", other),
    }
    assert_eq!(
        serde_json::from_str::<ServerMessage>(r#"{"type":"pong"}"#).unwrap(),
        ServerMessage::Pong
    );
}

#[test]
fn test_admission_terminal_reasons() {
    let denied = |reason: &str| AdmissionResponse {
        allowed: false,
        reason: reason.to_string(),
    };
    assert!(denied("You have been banned").is_terminal_denial());
    assert!(denied("kicked by admin").is_terminal_denial());
    assert!(denied("Server at capacity").is_terminal_denial());
    assert!(!denied("rate limited").is_terminal_denial());
    assert!(!AdmissionResponse {
        allowed: true,
        reason: String::new()
    }
    .is_terminal_denial());
}

#[test]
fn test_admission_request_omits_missing_password() {
    let request = AdmissionRequest {
        user_session_id: "abc".to_string(),
        password: None,
    };
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({"user_session_id": "abc"})
    );
}
