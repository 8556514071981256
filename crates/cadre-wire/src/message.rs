//! The application-level message protocol.
//!
//! Everything agents say to each other is either a [`Request`] or a
//! [`Response`]; the correlation key on a response names the request it
//! answers. Each variant maps to one wire class, all under the `cadre.`
//! prefix.

use std::sync::Arc;

use crate::encode::encode_value;
use crate::error::WireError;
use crate::registry::TypeRegistry;
use crate::types::{AgentIdentity, AgentState, CorrelationKey};
use crate::value::{WireObject, WireValue};

pub const CLASS_CONNECT_REQUEST: &str = "cadre.ConnectRequest";
pub const CLASS_PING_REQUEST: &str = "cadre.PingRequest";
pub const CLASS_SHUTDOWN_REQUEST: &str = "cadre.ShutdownRequest";
pub const CLASS_STATUS_REQUEST: &str = "cadre.StatusRequest";
pub const CLASS_OK_RESPONSE: &str = "cadre.OkResponse";
pub const CLASS_DENIED_RESPONSE: &str = "cadre.DeniedResponse";
pub const CLASS_PING_RESPONSE: &str = "cadre.PingResponse";
pub const CLASS_UNSUPPORTED_RESPONSE: &str = "cadre.UnsupportedResponse";
pub const CLASS_STATUS_RESPONSE: &str = "cadre.StatusResponse";
pub const CLASS_AGENT_IDENTITY: &str = "cadre.AgentIdentity";

/// Anything a peer may send.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn key(&self) -> &CorrelationKey {
        match self {
            Message::Request(r) => &r.key,
            Message::Response(r) => &r.key,
        }
    }

    pub fn to_wire(&self) -> WireObject {
        match self {
            Message::Request(r) => r.to_wire(),
            Message::Response(r) => r.to_wire(),
        }
    }

    /// Wire form, ready to append to an outbound buffer.
    pub fn encode(&self) -> String {
        encode_value(&WireValue::Object(self.to_wire()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub key: CorrelationKey,
    pub body: RequestBody,
}

impl Request {
    /// A request under a fresh correlation key.
    pub fn new(body: RequestBody) -> Self {
        Request { key: CorrelationKey::new(), body }
    }

    fn to_wire(&self) -> WireObject {
        let key = WireValue::Str(self.key.as_str().to_owned());
        match &self.body {
            RequestBody::Connect { identity } => WireObject::new(CLASS_CONNECT_REQUEST)
                .field("key", key)
                .field("identity", WireValue::Object(identity_to_wire(identity))),
            RequestBody::Ping => WireObject::new(CLASS_PING_REQUEST).field("key", key),
            RequestBody::Shutdown => WireObject::new(CLASS_SHUTDOWN_REQUEST).field("key", key),
            RequestBody::Status => WireObject::new(CLASS_STATUS_REQUEST).field("key", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Introduce ourselves and ask to be registered.
    Connect { identity: AgentIdentity },
    Ping,
    Shutdown,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub key: CorrelationKey,
    pub body: ResponseBody,
}

impl Response {
    /// A response echoing the request's key.
    pub fn new(key: CorrelationKey, body: ResponseBody) -> Self {
        Response { key, body }
    }

    fn to_wire(&self) -> WireObject {
        let key = WireValue::Str(self.key.as_str().to_owned());
        match &self.body {
            ResponseBody::Ok => WireObject::new(CLASS_OK_RESPONSE).field("key", key),
            ResponseBody::Denied => WireObject::new(CLASS_DENIED_RESPONSE).field("key", key),
            ResponseBody::Pong => WireObject::new(CLASS_PING_RESPONSE).field("key", key),
            ResponseBody::Unsupported => {
                WireObject::new(CLASS_UNSUPPORTED_RESPONSE).field("key", key)
            }
            ResponseBody::Status(report) => WireObject::new(CLASS_STATUS_RESPONSE)
                .field("key", key)
                .field("state", WireValue::Str(report.state.as_str().to_owned()))
                .field("identity", WireValue::Object(identity_to_wire(&report.identity)))
                .field("details", WireValue::Str(report.details.clone()))
                .field(
                    "agents",
                    WireValue::List(
                        report
                            .agents
                            .iter()
                            .map(|id| WireValue::Object(identity_to_wire(id)))
                            .collect(),
                    ),
                ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Ok,
    Denied,
    Pong,
    Unsupported,
    Status(StatusReport),
}

/// Snapshot of an agent as reported over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: AgentState,
    pub identity: AgentIdentity,
    pub details: String,
    /// Registered peers, populated only by directors.
    pub agents: Vec<AgentIdentity>,
}

/// Register every `cadre.*` class with `registry`.
pub fn register_defaults(registry: &mut TypeRegistry) {
    registry.register(CLASS_CONNECT_REQUEST, decode_connect_request);
    registry.register(CLASS_PING_REQUEST, decode_ping_request);
    registry.register(CLASS_SHUTDOWN_REQUEST, decode_shutdown_request);
    registry.register(CLASS_STATUS_REQUEST, decode_status_request);
    registry.register(CLASS_OK_RESPONSE, decode_ok_response);
    registry.register(CLASS_DENIED_RESPONSE, decode_denied_response);
    registry.register(CLASS_PING_RESPONSE, decode_ping_response);
    registry.register(CLASS_UNSUPPORTED_RESPONSE, decode_unsupported_response);
    registry.register(CLASS_STATUS_RESPONSE, decode_status_response);
    registry.register_auxiliary(CLASS_AGENT_IDENTITY);
}

/// A registry preloaded with the standard protocol.
pub fn standard_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    register_defaults(&mut registry);
    Arc::new(registry)
}

fn identity_to_wire(identity: &AgentIdentity) -> WireObject {
    WireObject::new(CLASS_AGENT_IDENTITY)
        .field("name", WireValue::Str(identity.name.clone()))
        .field(
            "host",
            match &identity.host {
                Some(host) => WireValue::Str(host.clone()),
                None => WireValue::None,
            },
        )
        .field(
            "port",
            match identity.port {
                Some(port) => WireValue::Int(i64::from(port)),
                None => WireValue::None,
            },
        )
}

fn instantiation(obj: &WireObject, reason: impl Into<String>) -> WireError {
    WireError::Instantiation { class: obj.class.clone(), reason: reason.into() }
}

fn require_field<'a>(obj: &'a WireObject, name: &str) -> Result<&'a WireValue, WireError> {
    obj.get(name)
        .ok_or_else(|| instantiation(obj, format!("missing field `{name}`")))
}

fn require_str<'a>(obj: &'a WireObject, name: &str) -> Result<&'a str, WireError> {
    require_field(obj, name)?
        .as_str()
        .ok_or_else(|| instantiation(obj, format!("field `{name}` is not a string")))
}

fn require_key(obj: &WireObject) -> Result<CorrelationKey, WireError> {
    Ok(CorrelationKey::from(require_str(obj, "key")?))
}

fn identity_from_wire(value: &WireValue, context: &WireObject) -> Result<AgentIdentity, WireError> {
    let obj = value
        .as_object()
        .filter(|o| o.class == CLASS_AGENT_IDENTITY)
        .ok_or_else(|| instantiation(context, "identity field is not a cadre.AgentIdentity"))?;
    let name = require_str(obj, "name")?.to_owned();
    let host = match obj.get("host") {
        Some(WireValue::Str(host)) => Some(host.clone()),
        Some(WireValue::None) | None => None,
        Some(_) => return Err(instantiation(obj, "field `host` is not a string")),
    };
    let port = match obj.get("port") {
        Some(WireValue::Int(port)) => Some(
            u16::try_from(*port)
                .map_err(|_| instantiation(obj, "field `port` out of range"))?,
        ),
        Some(WireValue::None) | None => None,
        Some(_) => return Err(instantiation(obj, "field `port` is not an integer")),
    };
    Ok(AgentIdentity { name, host, port })
}

fn decode_connect_request(obj: &WireObject) -> Result<Message, WireError> {
    let identity = identity_from_wire(require_field(obj, "identity")?, obj)?;
    Ok(Message::Request(Request {
        key: require_key(obj)?,
        body: RequestBody::Connect { identity },
    }))
}

fn decode_ping_request(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Request(Request { key: require_key(obj)?, body: RequestBody::Ping }))
}

fn decode_shutdown_request(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Request(Request { key: require_key(obj)?, body: RequestBody::Shutdown }))
}

fn decode_status_request(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Request(Request { key: require_key(obj)?, body: RequestBody::Status }))
}

fn decode_ok_response(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Response(Response { key: require_key(obj)?, body: ResponseBody::Ok }))
}

fn decode_denied_response(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Response(Response { key: require_key(obj)?, body: ResponseBody::Denied }))
}

fn decode_ping_response(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Response(Response { key: require_key(obj)?, body: ResponseBody::Pong }))
}

fn decode_unsupported_response(obj: &WireObject) -> Result<Message, WireError> {
    Ok(Message::Response(Response { key: require_key(obj)?, body: ResponseBody::Unsupported }))
}

fn decode_status_response(obj: &WireObject) -> Result<Message, WireError> {
    let state_text = require_str(obj, "state")?;
    let state = AgentState::parse(state_text)
        .ok_or_else(|| instantiation(obj, format!("unknown agent state `{state_text}`")))?;
    let identity = identity_from_wire(require_field(obj, "identity")?, obj)?;
    let details = require_str(obj, "details")?.to_owned();
    let agents = match require_field(obj, "agents")? {
        WireValue::List(items) => items
            .iter()
            .map(|item| identity_from_wire(item, obj))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(instantiation(obj, "field `agents` is not a list")),
    };
    Ok(Message::Response(Response {
        key: require_key(obj)?,
        body: ResponseBody::Status(StatusReport { state, identity, details, agents }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{FeedOutcome, StreamDecoder};

    fn round_trip(message: Message) {
        let registry = standard_registry();
        let encoded = message.encode();
        let mut decoder = StreamDecoder::new(registry.clone());
        let value = match decoder.feed(encoded.as_bytes()) {
            Ok(FeedOutcome::Complete { value, consumed }) => {
                assert_eq!(consumed, encoded.len());
                value
            }
            other => panic!("decode failed: {other:?}"),
        };
        let obj = value.as_object().expect("top-level object");
        let decoded = registry.instantiate(obj).unwrap().expect("a message");
        assert_eq!(decoded, message);
    }

    #[test]
    fn request_round_trips() {
        round_trip(Message::Request(Request::new(RequestBody::Ping)));
        round_trip(Message::Request(Request::new(RequestBody::Shutdown)));
        round_trip(Message::Request(Request::new(RequestBody::Status)));
        round_trip(Message::Request(Request::new(RequestBody::Connect {
            identity: AgentIdentity::with_addr("worker", "127.0.0.1", 9001),
        })));
        round_trip(Message::Request(Request::new(RequestBody::Connect {
            identity: AgentIdentity::new("dial-only"),
        })));
    }

    #[test]
    fn response_round_trips() {
        let key = CorrelationKey::new();
        round_trip(Message::Response(Response::new(key.clone(), ResponseBody::Ok)));
        round_trip(Message::Response(Response::new(key.clone(), ResponseBody::Denied)));
        round_trip(Message::Response(Response::new(key.clone(), ResponseBody::Pong)));
        round_trip(Message::Response(Response::new(key.clone(), ResponseBody::Unsupported)));
        round_trip(Message::Response(Response::new(
            key,
            ResponseBody::Status(StatusReport {
                state: AgentState::Running,
                identity: AgentIdentity::with_addr("director", "127.0.0.1", 9000),
                details: "3 agents registered".into(),
                agents: vec![
                    AgentIdentity::with_addr("worker-a", "10.0.0.2", 9001),
                    AgentIdentity::new("worker-b"),
                ],
            }),
        )));
    }

    #[test]
    fn missing_key_is_an_instantiation_error() {
        let obj = WireObject::new(CLASS_PING_REQUEST);
        match standard_registry().instantiate(&obj) {
            Err(WireError::Instantiation { class, .. }) => {
                assert_eq!(class, CLASS_PING_REQUEST);
            }
            other => panic!("expected instantiation error, got {other:?}"),
        }
    }

    #[test]
    fn bare_identity_is_known_but_not_a_message() {
        let registry = standard_registry();
        assert!(registry.is_known(CLASS_AGENT_IDENTITY));
        let obj = WireObject::new(CLASS_AGENT_IDENTITY)
            .field("name", WireValue::Str("x".into()));
        assert!(matches!(registry.instantiate(&obj), Ok(None)));
    }

    #[test]
    fn unregistered_class_rejected() {
        let obj = WireObject::new("cadre.Bogus");
        assert!(matches!(
            standard_registry().instantiate(&obj),
            Err(WireError::UnknownType { .. })
        ));
    }
}
