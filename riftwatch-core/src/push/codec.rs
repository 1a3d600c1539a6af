//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the subset the backend uses over a plain WebSocket is supported:
//!
//! ```text
//! 0{"sid":..,"pingInterval":..}   engine open
//! 1                               engine close
//! 2 / 3                           ping / pong
//! 40 / 40{"sid":..}               namespace connect (sent / acknowledged)
//! 41                              namespace disconnect
//! 42["event",{payload}]           event
//! 44{"message":..}                connect error
//! ```
//!
//! Binary attachments are not supported.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Frame we send to join the default namespace.
pub const CONNECT_FRAME: &str = "40";

/// Payload of the engine open packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// An Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    /// Carries a Socket.IO packet
    Message(String),
    Upgrade,
    Noop,
}

/// A Socket.IO packet on the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError(String),
    /// Acks and binary packets, which we never request
    Unsupported(char),
}

/// Decode one WebSocket text frame as an Engine.IO packet.
pub fn decode_engine(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty frame".to_string()))?;
    let body = chars.as_str();

    Ok(match kind {
        '0' => {
            let handshake: OpenHandshake = serde_json::from_str(body)
                .map_err(|e| Error::Protocol(format!("bad open packet: {}", e)))?;
            EnginePacket::Open(handshake)
        }
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping(body.to_string()),
        '3' => EnginePacket::Pong(body.to_string()),
        '4' => EnginePacket::Message(body.to_string()),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => {
            return Err(Error::Protocol(format!(
                "unknown engine packet type {:?}",
                other
            )))
        }
    })
}

/// Decode the body of an engine message as a Socket.IO packet.
pub fn decode_socket(body: &str) -> Result<SocketPacket> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty socket packet".to_string()))?;
    let rest = skip_namespace(chars.as_str());

    Ok(match kind {
        '0' => SocketPacket::Connect,
        '1' => SocketPacket::Disconnect,
        '2' => {
            // An ack id may precede the JSON array.
            let json = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            decode_event(json)?
        }
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            SocketPacket::ConnectError(message)
        }
        '3' | '5' | '6' => SocketPacket::Unsupported(kind),
        other => {
            return Err(Error::Protocol(format!(
                "unknown socket packet type {:?}",
                other
            )))
        }
    })
}

/// Strip a `/namespace,` prefix if present.
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn decode_event(json: &str) -> Result<SocketPacket> {
    let args: Vec<Value> = serde_json::from_str(json)
        .map_err(|e| Error::Protocol(format!("bad event packet: {}", e)))?;
    let mut args = args.into_iter();

    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(Error::Protocol("event without a name".to_string())),
    };
    let payload = args.next().unwrap_or(Value::Null);

    Ok(SocketPacket::Event { name, payload })
}

/// Encode an event frame, e.g. `42["start_auto_accept"]`.
pub fn encode_event(name: &str, payload: Option<&Value>) -> String {
    let args = match payload {
        Some(payload) => Value::Array(vec![Value::String(name.to_string()), payload.clone()]),
        None => Value::Array(vec![Value::String(name.to_string())]),
    };
    format!("42{}", args)
}

/// Encode the pong answering a ping, echoing its data.
pub fn encode_pong(data: &str) -> String {
    format!("3{}", data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let packet =
            decode_engine(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
                .unwrap();
        let EnginePacket::Open(h) = packet else {
            panic!("expected open");
        };
        assert_eq!(h.sid, "abc");
        assert_eq!(h.ping_interval, 25000);
        assert_eq!(h.ping_timeout, 20000);
    }

    #[test]
    fn test_decode_ping_and_message() {
        assert_eq!(decode_engine("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(
            decode_engine("2hello").unwrap(),
            EnginePacket::Ping("hello".to_string())
        );
        assert_eq!(
            decode_engine("40").unwrap(),
            EnginePacket::Message("0".to_string())
        );
        assert!(decode_engine("").is_err());
        assert!(decode_engine("9").is_err());
    }

    #[test]
    fn test_decode_event() {
        let packet = decode_socket(r#"2["status_update",{"message":"LCU 连接成功"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "status_update".to_string(),
                payload: json!({"message": "LCU 连接成功"}),
            }
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack_id() {
        let packet = decode_socket(r#"2/game,17["teammates_found",{"teammates":[]}]"#).unwrap();
        assert!(matches!(packet, SocketPacket::Event { ref name, .. } if name == "teammates_found"));
    }

    #[test]
    fn test_decode_event_without_payload() {
        let packet = decode_socket(r#"2["ping_me"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "ping_me".to_string(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn test_decode_connect_variants() {
        assert_eq!(decode_socket("0").unwrap(), SocketPacket::Connect);
        assert_eq!(decode_socket(r#"0{"sid":"x"}"#).unwrap(), SocketPacket::Connect);
        assert_eq!(decode_socket("1").unwrap(), SocketPacket::Disconnect);
        assert_eq!(
            decode_socket(r#"4{"message":"Not authorized"}"#).unwrap(),
            SocketPacket::ConnectError("Not authorized".to_string())
        );
    }

    #[test]
    fn test_decode_bad_event() {
        assert!(decode_socket("2not json").is_err());
        assert!(decode_socket("2[42]").is_err());
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(encode_event("start_auto_accept", None), r#"42["start_auto_accept"]"#);
        assert_eq!(
            encode_event("x", Some(&json!({"a": 1}))),
            r#"42["x",{"a":1}]"#
        );
        assert_eq!(encode_pong("hello"), "3hello");
    }
}
