//! Canned reactor assemblies for the common agent roles.

use cadre_wire::AgentIdentity;
use tokio::sync::oneshot;
use tracing::info;

use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::event::{Event, EventKind, EventSource};
use crate::jobs::{
    ConnectJob, ControlOutcome, HandleConnectJob, HandlePingJob, HandleShutdownJob,
    HandleStatusJob, PingJob, ShutdownBroadcastJob, ShutdownCommandJob, StatusCommandJob,
};
use crate::reactor::AgentReactor;

/// A director: accepts registrations, heartbeats the fleet, answers
/// status queries with the full peer list, and turns one shutdown
/// request into an orderly shutdown of everyone.
pub async fn build_director(config: AgentConfig) -> AgentResult<AgentReactor> {
    let ping = config.ping.clone();
    let mut reactor = AgentReactor::bind(config).await?;
    reactor.add_listener(Box::new(HandleConnectJob));
    reactor.add_listener(Box::new(HandlePingJob));
    reactor.add_listener(Box::new(HandleStatusJob { report_peers: true }));
    reactor.add_listener(Box::new(ShutdownBroadcastJob::new()));
    PingJob::install(&mut reactor, ping);
    info!(agent = %reactor.config().identity.name, "director assembled");
    Ok(reactor)
}

/// An ordinary agent: answers the standard requests and, when a
/// director is configured, registers with it at startup.
pub async fn build_agent(config: AgentConfig) -> AgentResult<AgentReactor> {
    let director = config.director.clone();
    let connect = config.connect.clone();
    let mut reactor = AgentReactor::bind(config).await?;
    reactor.add_listener(Box::new(HandleConnectJob));
    reactor.add_listener(Box::new(HandlePingJob));
    reactor.add_listener(Box::new(HandleShutdownJob));
    reactor.add_listener(Box::new(HandleStatusJob { report_peers: false }));
    if let Some(director) = director {
        start_connect_job(&mut reactor, director, connect);
    }
    Ok(reactor)
}

/// Register a [`ConnectJob`] and queue its kick-off event.
pub fn start_connect_job(
    reactor: &mut AgentReactor,
    target: AgentIdentity,
    config: crate::config::ConnectConfig,
) -> crate::event::ListenerId {
    let id = reactor.add_listener(Box::new(ConnectJob::new(target, config)));
    reactor.push_event(Event::new(EventSource::Reactor, EventKind::RunListener { listener: id }));
    id
}

/// A throwaway agent that registers with `target`, asks it to shut
/// down, and reports how that went.
pub async fn build_shutdown_command(
    config: AgentConfig,
    target: AgentIdentity,
) -> AgentResult<(AgentReactor, oneshot::Receiver<ControlOutcome>)> {
    let connect = config.connect.clone();
    let mut reactor = build_agent(config).await?;
    let connect_job = start_connect_job(&mut reactor, target, connect);
    let (tx, rx) = oneshot::channel();
    reactor.add_listener(Box::new(ShutdownCommandJob::new(connect_job, tx)));
    Ok((reactor, rx))
}

/// A throwaway agent that registers with `target` and fetches its
/// status report.
pub async fn build_status_command(
    config: AgentConfig,
    target: AgentIdentity,
) -> AgentResult<(AgentReactor, oneshot::Receiver<ControlOutcome>)> {
    let connect = config.connect.clone();
    let mut reactor = build_agent(config).await?;
    let connect_job = start_connect_job(&mut reactor, target, connect);
    let (tx, rx) = oneshot::channel();
    reactor.add_listener(Box::new(StatusCommandJob::new(connect_job, tx)));
    Ok((reactor, rx))
}
