//! Engine.IO v4 / Socket.IO v4 text framing.
//!
//! Only the subset a WebSocket-only server needs: the open handshake,
//! heartbeats, namespace connect/disconnect and events on the default
//! namespace. Binary packets are not supported.
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const PROTOCOL_VERSION: &str = "4";
pub const DEFAULT_NAMESPACE: &str = "/";
pub const PING: &str = "2";
pub const PONG: &str = "3";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown Engine.IO packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown Socket.IO packet type {0:?}")]
    UnknownSocketType(char),
    #[error("binary Socket.IO packets are not supported")]
    BinaryUnsupported,
    #[error("event packet without an event name")]
    MissingEventName,
    #[error("malformed packet data: {0}")]
    Json(#[from] serde_json::Error),
}

/// A packet received from a client.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientPacket {
    Close,
    Ping,
    Pong,
    Upgrade,
    Noop,
    Connect { namespace: String },
    Disconnect { namespace: String },
    Event {
        namespace: String,
        name: String,
        args: Vec<Value>,
    },
    /// Acknowledgements and other packets the server has no use for.
    Ignored,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenPayload<'a> {
    sid: &'a str,
    upgrades: [&'a str; 0],
    ping_interval: u64,
    ping_timeout: u64,
    max_payload: u64,
}

/// Largest message the server accepts, advertised in the open packet.
pub const MAX_PAYLOAD: u64 = 1_000_000;

impl ClientPacket {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();
        match kind {
            '1' => Ok(ClientPacket::Close),
            '2' => Ok(ClientPacket::Ping),
            '3' => Ok(ClientPacket::Pong),
            '4' => decode_socket_packet(rest),
            '5' => Ok(ClientPacket::Upgrade),
            '6' => Ok(ClientPacket::Noop),
            other => Err(ProtocolError::UnknownEngineType(other)),
        }
    }
}

fn decode_socket_packet(text: &str) -> Result<ClientPacket, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let (namespace, rest) = split_namespace(chars.as_str());
    let namespace = namespace.to_string();

    match kind {
        '0' => Ok(ClientPacket::Connect { namespace }),
        '1' => Ok(ClientPacket::Disconnect { namespace }),
        '2' => {
            let data = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(data)?;
            if args.is_empty() {
                return Err(ProtocolError::MissingEventName);
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                _ => return Err(ProtocolError::MissingEventName),
            };
            Ok(ClientPacket::Event {
                namespace,
                name,
                args,
            })
        }
        '3' | '4' => Ok(ClientPacket::Ignored),
        '5' | '6' => Err(ProtocolError::BinaryUnsupported),
        other => Err(ProtocolError::UnknownSocketType(other)),
    }
}

/// Splits a leading `/namespace,` off `text`; absent means the default
/// namespace.
fn split_namespace(text: &str) -> (&str, &str) {
    if !text.starts_with('/') {
        return (DEFAULT_NAMESPACE, text);
    }
    match text.find(',') {
        Some(comma) => (&text[..comma], &text[comma + 1..]),
        None => (text, ""),
    }
}

/// Engine.IO open packet (`0{...}`), first frame on every connection.
pub fn open_packet(sid: &str, ping_interval_ms: u64, ping_timeout_ms: u64) -> String {
    let payload = OpenPayload {
        sid,
        upgrades: [],
        ping_interval: ping_interval_ms,
        ping_timeout: ping_timeout_ms,
        max_payload: MAX_PAYLOAD,
    };
    // Serializing a struct of strings and integers cannot fail.
    format!("0{}", serde_json::to_string(&payload).unwrap_or_default())
}

/// Socket.IO connect acknowledgement on the default namespace.
pub fn connect_ack(sid: &str) -> String {
    format!("40{}", serde_json::json!({ "sid": sid }))
}

/// Socket.IO connect refusal for `namespace`.
pub fn connect_error(namespace: &str, message: &str) -> String {
    let body = serde_json::json!({ "message": message });
    if namespace == DEFAULT_NAMESPACE {
        format!("44{body}")
    } else {
        format!("44{namespace},{body}")
    }
}

/// Socket.IO event on the default namespace; `payload_json` is inserted
/// verbatim as the single argument.
pub fn event_packet(event: &str, payload_json: &str) -> String {
    let name = Value::String(event.to_string());
    format!("42[{name},{payload_json}]")
}

/// Socket.IO disconnect from the default namespace.
pub fn disconnect_packet() -> String {
    "41".to_string()
}
