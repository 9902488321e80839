use super::*;
use serde_json::json;

#[test]
fn test_subscribe_wire_shape() {
    let msg = ControlMessage::subscribe(["containers", "health"]);
    let value: Value = serde_json::from_str(&msg.to_json()).unwrap();
    assert_eq!(
        value,
        json!({"type": "subscribe", "data": {"channels": ["containers", "health"]}})
    );
}

#[test]
fn test_unsubscribe_wire_shape() {
    let msg = ControlMessage::unsubscribe(vec!["health".to_string()]);
    let value: Value = serde_json::from_str(&msg.to_json()).unwrap();
    assert_eq!(
        value,
        json!({"type": "unsubscribe", "data": {"channels": ["health"]}})
    );
}

#[test]
fn test_ping_pong_wire_shape() {
    assert_eq!(ControlMessage::Ping.to_json(), r#"{"type":"ping"}"#);
    assert_eq!(ControlMessage::Pong.to_json(), r#"{"type":"pong"}"#);
}

#[test]
fn test_control_message_deserialize() {
    let parsed: ControlMessage =
        serde_json::from_str(r#"{"type":"subscribe","data":{"channels":["a"]}}"#).unwrap();
    assert_eq!(parsed, ControlMessage::subscribe(["a"]));
}

#[test]
fn test_parse_update() {
    let msg = InboundMessage::parse(
        r#"{"type":"update","channel":"containers","data":{"container_id":"mb-123","status":"running"}}"#,
    )
    .unwrap();
    assert_eq!(
        msg,
        InboundMessage::Update {
            channel: "containers".to_string(),
            data: json!({"container_id": "mb-123", "status": "running"}),
        }
    );
}

#[test]
fn test_parse_update_defaults() {
    let msg = InboundMessage::parse(r#"{"type":"update"}"#).unwrap();
    assert_eq!(
        msg,
        InboundMessage::Update {
            channel: String::new(),
            data: json!({}),
        }
    );

    let msg = InboundMessage::parse(r#"{"type":"update","channel":"x","data":null}"#).unwrap();
    assert_eq!(
        msg,
        InboundMessage::Update {
            channel: "x".to_string(),
            data: json!({}),
        }
    );
}

#[test]
fn test_parse_keepalive() {
    assert_eq!(InboundMessage::parse(r#"{"type":"ping"}"#).unwrap(), InboundMessage::Ping);
    assert_eq!(InboundMessage::parse(r#"{"type":"pong"}"#).unwrap(), InboundMessage::Pong);
}

#[test]
fn test_parse_acks() {
    let msg =
        InboundMessage::parse(r#"{"type":"subscribed","data":{"channels":["containers"]}}"#)
            .unwrap();
    assert_eq!(
        msg,
        InboundMessage::Subscribed(json!({"channels": ["containers"]}))
    );

    let msg = InboundMessage::parse(r#"{"type":"unsubscribed"}"#).unwrap();
    assert_eq!(msg, InboundMessage::Unsubscribed(Value::Null));
}

#[test]
fn test_parse_unknown_type_is_not_error() {
    let msg = InboundMessage::parse(r#"{"type":"deploy_progress","data":{}}"#).unwrap();
    assert_eq!(msg, InboundMessage::Unrecognized("deploy_progress".to_string()));

    let msg = InboundMessage::parse(r#"{"channel":"x"}"#).unwrap();
    assert_eq!(msg, InboundMessage::Unrecognized(String::new()));
}

#[test]
fn test_parse_rejects_non_json() {
    assert!(matches!(
        InboundMessage::parse("not json"),
        Err(FrameError::InvalidJson(_))
    ));
    assert!(matches!(
        InboundMessage::parse("[1, 2]"),
        Err(FrameError::InvalidJson(_))
    ));
}
