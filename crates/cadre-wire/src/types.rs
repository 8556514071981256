//! Identity and lifecycle types shared across the framework.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an agent process.
///
/// The reactor moves strictly forward through these states; it never
/// returns to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Stopped => "stopped",
            AgentState::Starting => "starting",
            AgentState::Running => "running",
            AgentState::Stopping => "stopping",
        }
    }

    pub fn parse(s: &str) -> Option<AgentState> {
        match s {
            "stopped" => Some(AgentState::Stopped),
            "starting" => Some(AgentState::Starting),
            "running" => Some(AgentState::Running),
            "stopping" => Some(AgentState::Stopping),
            _ => None,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an agent introduces itself to its peers.
///
/// `host` and `port` are the agent's own listening address, when it has
/// one. Agents that only dial out (command-line utilities, mostly) leave
/// them unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        AgentIdentity {
            name: name.into(),
            host: None,
            port: None,
        }
    }

    pub fn with_addr(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        AgentIdentity {
            name: name.into(),
            host: Some(host.into()),
            port: Some(port),
        }
    }

    /// The listening address, if both halves are present.
    pub fn addr(&self) -> Option<(&str, u16)> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some((host.as_str(), port)),
            _ => None,
        }
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr() {
            Some((host, port)) => write!(f, "{}@{}:{}", self.name, host, port),
            None => f.write_str(&self.name),
        }
    }
}

/// Opaque key tying a response to the request it answers.
///
/// Freshly minted keys are random UUIDs; keys read off the wire are kept
/// verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new() -> Self {
        CorrelationKey(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationKey {
    fn default() -> Self {
        CorrelationKey::new()
    }
}

impl From<String> for CorrelationKey {
    fn from(s: String) -> Self {
        CorrelationKey(s)
    }
}

impl From<&str> for CorrelationKey {
    fn from(s: &str) -> Self {
        CorrelationKey(s.to_owned())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_keys_are_distinct() {
        assert_ne!(CorrelationKey::new(), CorrelationKey::new());
    }

    #[test]
    fn state_round_trips_through_text() {
        for state in [
            AgentState::Stopped,
            AgentState::Starting,
            AgentState::Running,
            AgentState::Stopping,
        ] {
            assert_eq!(AgentState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AgentState::parse("paused"), None);
    }

    #[test]
    fn identity_addr_needs_both_halves() {
        let mut id = AgentIdentity::new("worker");
        assert_eq!(id.addr(), None);
        id.host = Some("10.0.0.1".into());
        assert_eq!(id.addr(), None);
        id.port = Some(9000);
        assert_eq!(id.addr(), Some(("10.0.0.1", 9000)));
    }
}
