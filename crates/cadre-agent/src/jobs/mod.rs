//! Jobs: listeners that carry a conversation.
//!
//! A job watches the event stream for the requests it serves or the
//! responses it is waiting on, correlating by key. Request handlers are
//! stateless; the dialling jobs track their outstanding keys and timers.

pub mod connect;
pub mod control;
pub mod ping;
pub mod service;
pub mod shutdown;

pub use connect::ConnectJob;
pub use control::{ControlOutcome, ShutdownCommandJob, StatusCommandJob};
pub use ping::PingJob;
pub use service::{HandleConnectJob, HandlePingJob, HandleShutdownJob, HandleStatusJob};
pub use shutdown::ShutdownBroadcastJob;
