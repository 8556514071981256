//! Agent configuration, loadable from TOML.

use std::path::Path;
use std::time::Duration;

use cadre_wire::AgentIdentity;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything an agent process needs to know at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Our own name and, for listening agents, bind address.
    pub identity: AgentIdentity,
    /// The director to register with, for ordinary agents.
    pub director: Option<AgentIdentity>,
    pub ping: PingConfig,
    pub connect: ConnectConfig,
    /// Free-form text echoed in status reports.
    pub status_details: String,
}

/// Heartbeat tuning, used by directors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Gap between ping rounds.
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    /// How long a peer gets to answer before it is dropped.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Registration retry tuning, used by agents dialling a director.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Gap between registration attempts.
    #[serde(with = "duration_secs")]
    pub retry_interval: Duration,
    /// Give up after this many retries; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            retry_interval: Duration::from_secs(3),
            max_retries: None,
        }
    }
}

/// Load a config file, falling back to defaults on any problem.
pub fn load_config(path: Option<&Path>) -> AgentConfig {
    let Some(path) = path else {
        return AgentConfig::default();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read config, using defaults");
            return AgentConfig::default();
        }
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot parse config, using defaults");
            AgentConfig::default()
        }
    }
}

/// Durations as (possibly fractional) seconds in TOML.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
