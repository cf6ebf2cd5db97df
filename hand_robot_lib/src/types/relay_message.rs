use crate::{ActuatorCommand, GestureName, Point3, WireError, HAND_NOT_DETECTED};
use serde::{Deserialize, Deserializer, Serialize};

/// Hand snapshot wrapped in a relay message (`{"hand": {...}}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandReport {
    pub palm_center: Point3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrist: Option<Point3>,
    /// Names outside the known gesture set decode as `None`
    #[serde(
        default,
        deserialize_with = "lenient_gesture",
        skip_serializing_if = "Option::is_none"
    )]
    pub gesture: Option<GestureName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

fn lenient_gesture<'de, D>(deserializer: D) -> Result<Option<GestureName>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Inbound relay message, classified once when the text is decoded
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Heartbeat,
    /// Registers the sender as a consumer of relayed commands
    Subscribe,
    HandData(HandReport),
    /// A non-empty `hand` payload that does not decode as a [`HandReport`].
    /// Acknowledged like hand data but never relayed.
    UnmappedHand,
    Command(ActuatorCommand),
    HandNotDetected,
    /// Valid JSON with no recognized shape
    Unrecognized,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Envelope {
    Heartbeat,
    Subscribe,
    HandData { hand: HandReport },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInbound {
    Envelope(Envelope),
    Hand { hand: HandReport },
    HandPayload { hand: serde_json::Value },
    Command(ActuatorCommand),
    Sentinel { error: String },
    Other(serde_json::Value),
}

impl ClientMessage {
    /// Decode a text frame. Text that is neither JSON nor a delimited
    /// command is an error; the session stays open either way.
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WireError::Empty);
        }

        if !trimmed.starts_with('{') {
            if trimmed == format!("error,{}", HAND_NOT_DETECTED) {
                return Ok(ClientMessage::HandNotDetected);
            }
            return ActuatorCommand::decode(trimmed).map(ClientMessage::Command);
        }

        let inbound: JsonInbound =
            serde_json::from_str(trimmed).map_err(|e| WireError::Json(e.to_string()))?;

        Ok(match inbound {
            JsonInbound::Envelope(Envelope::Heartbeat) => ClientMessage::Heartbeat,
            JsonInbound::Envelope(Envelope::Subscribe) => ClientMessage::Subscribe,
            JsonInbound::Envelope(Envelope::HandData { hand }) | JsonInbound::Hand { hand } => {
                ClientMessage::HandData(hand)
            }
            JsonInbound::HandPayload { hand } if is_present(&hand) => ClientMessage::UnmappedHand,
            JsonInbound::Command(command) => ClientMessage::Command(command),
            JsonInbound::Sentinel { error } if error == HAND_NOT_DETECTED => {
                ClientMessage::HandNotDetected
            }
            JsonInbound::HandPayload { .. } | JsonInbound::Sentinel { .. } | JsonInbound::Other(_) => {
                ClientMessage::Unrecognized
            }
        })
    }
}

/// `null`, `false`, zero and the empty string count as an absent payload
fn is_present(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Client-side heartbeat envelope
pub fn heartbeat_message() -> String {
    serde_json::json!({ "type": "heartbeat" }).to_string()
}

/// Relay control-plane replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Connection {
        status: String,
        #[serde(rename = "clientId")]
        client_id: String,
    },
    HandData {
        status: String,
        timestamp: u64,
    },
    Heartbeat {
        timestamp: u64,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn connected(client_id: impl Into<String>) -> Self {
        Self::Connection {
            status: "connected".to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn subscribed(client_id: impl Into<String>) -> Self {
        Self::Connection {
            status: "subscribed".to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn received(timestamp: u64) -> Self {
        Self::HandData {
            status: "received".to_string(),
            timestamp,
        }
    }

    pub fn heartbeat(timestamp: u64) -> Self {
        Self::Heartbeat { timestamp }
    }

    pub fn invalid_format() -> Self {
        Self::Error {
            message: "Invalid message format".to_string(),
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Response of the relay status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub clients: usize,
    /// Process uptime in seconds
    pub uptime: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heartbeat_and_subscribe() {
        assert_eq!(ClientMessage::parse(r#"{"type":"heartbeat"}"#).unwrap(), ClientMessage::Heartbeat);
        assert_eq!(ClientMessage::parse(r#"{"type":"subscribe"}"#).unwrap(), ClientMessage::Subscribe);
    }

    #[test]
    fn test_parse_wrapped_hand() {
        let text = r#"{"timestamp": 1, "hand": {"palmCenter": {"x": 0.5, "y": 0.5, "z": 0.0}, "gesture": "Grab", "confidence": 0.9}}"#;
        match ClientMessage::parse(text).unwrap() {
            ClientMessage::HandData(hand) => {
                assert_eq!(hand.palm_center, Point3::new(0.5, 0.5, 0.0));
                assert_eq!(hand.gesture, Some(GestureName::Grab));
                assert!(hand.wrist.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let tagged = r#"{"type":"handData","hand":{"palmCenter":{"x":0.1,"y":0.2,"z":0.3}}}"#;
        assert!(matches!(ClientMessage::parse(tagged).unwrap(), ClientMessage::HandData(_)));
    }

    #[test]
    fn test_parse_hand_with_unknown_gesture() {
        let text = r#"{"hand":{"palmCenter":{"x":0.5,"y":0.5,"z":0.0},"gesture":"Open","confidence":0.8}}"#;
        match ClientMessage::parse(text).unwrap() {
            ClientMessage::HandData(hand) => {
                assert_eq!(hand.gesture, None);
                assert_eq!(hand.confidence, Some(0.8));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let numeric = r#"{"hand":{"palmCenter":{"x":0.5,"y":0.5,"z":0.0},"gesture":3}}"#;
        assert!(matches!(ClientMessage::parse(numeric).unwrap(), ClientMessage::HandData(_)));
    }

    #[test]
    fn test_parse_partial_hand_payload() {
        let missing_z = r#"{"hand":{"palmCenter":{"x":0.5,"y":0.5},"gesture":"Grab"}}"#;
        assert_eq!(ClientMessage::parse(missing_z).unwrap(), ClientMessage::UnmappedHand);

        let tagged = r#"{"type":"handData","hand":{"landmarks":[]}}"#;
        assert_eq!(ClientMessage::parse(tagged).unwrap(), ClientMessage::UnmappedHand);

        assert_eq!(ClientMessage::parse(r#"{"hand":null}"#).unwrap(), ClientMessage::Unrecognized);
        assert_eq!(ClientMessage::parse(r#"{"hand":""}"#).unwrap(), ClientMessage::Unrecognized);
    }

    #[test]
    fn test_parse_commands_in_both_encodings() {
        let json = r#"{"base_rotation":90,"vertical_movement":90,"joint_horizontal":60,"grabber":0}"#;
        let expected = ActuatorCommand::new(90, 90, 60, 0);
        assert_eq!(ClientMessage::parse(json).unwrap(), ClientMessage::Command(expected));
        assert_eq!(ClientMessage::parse("90,90,60,0").unwrap(), ClientMessage::Command(expected));
    }

    #[test]
    fn test_parse_sentinel() {
        assert_eq!(
            ClientMessage::parse(r#"{"error":"No hand detected"}"#).unwrap(),
            ClientMessage::HandNotDetected
        );
        assert_eq!(
            ClientMessage::parse("error,No hand detected").unwrap(),
            ClientMessage::HandNotDetected
        );
        assert_eq!(
            ClientMessage::parse(r#"{"error":"something else"}"#).unwrap(),
            ClientMessage::Unrecognized
        );
    }

    #[test]
    fn test_parse_unrecognized_and_malformed() {
        assert_eq!(ClientMessage::parse(r#"{"type":"dance"}"#).unwrap(), ClientMessage::Unrecognized);
        assert!(ClientMessage::parse("{not json").is_err());
        assert!(ClientMessage::parse("hello").is_err());
        assert!(ClientMessage::parse("").is_err());
    }

    #[test]
    fn test_server_message_shapes() {
        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::connected("abc").to_text()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "connection", "status": "connected", "clientId": "abc"}));

        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::received(42).to_text()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "handData", "status": "received", "timestamp": 42}));

        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::invalid_format().to_text()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "error", "message": "Invalid message format"}));

        assert_eq!(heartbeat_message(), r#"{"type":"heartbeat"}"#);
    }
}
