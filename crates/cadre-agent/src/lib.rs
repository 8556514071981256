//! Cadre agent runtime.
//!
//! An agent is a single-task reactor multiplexing TCP connections, a
//! FIFO event queue, and a set of interval timers. Application behavior
//! is supplied by [`Listener`]s — jobs, mostly — that watch the event
//! stream and act through the dispatch [`Context`].
//!
//! The canned roles live in [`bootstrap`]: a director that registers and
//! heartbeats a fleet of agents, ordinary agents that register with a
//! director, and one-shot command agents for shutdown and status.

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod jobs;
pub mod reactor;
pub mod timer;

pub use config::{load_config, AgentConfig, ConnectConfig, PingConfig};
pub use connection::{Connection, ConnectionId, ReadOutcome, Socket};
pub use error::{AgentError, AgentResult};
pub use event::{Event, EventKind, EventQueue, EventSource, Listener, ListenerId};
pub use reactor::{AgentReactor, Context};
pub use timer::{Timer, TimerId, TimerSet};
