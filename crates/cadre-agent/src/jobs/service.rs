//! Request handlers every agent installs.
//!
//! Each of these answers one request kind arriving on any connection.
//! Requests that require registration are refused with `Denied` when the
//! connection has no peer identity yet.

use cadre_wire::{Message, Request, RequestBody, Response, ResponseBody, StatusReport};
use tracing::{debug, info};

use crate::connection::ConnectionId;
use crate::event::{Event, EventKind, EventSource, Listener};
use crate::reactor::Context;

/// Pull a request off an event, with the connection it arrived on.
fn incoming_request(event: &Event) -> Option<(ConnectionId, &Request)> {
    let EventSource::Connection(conn) = event.source else {
        return None;
    };
    match &event.kind {
        EventKind::MessageReceived { message: Message::Request(request) } => {
            Some((conn, request))
        }
        _ => None,
    }
}

/// Registers peers that introduce themselves.
pub struct HandleConnectJob;

impl Listener for HandleConnectJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        let Some((conn, request)) = incoming_request(event) else {
            return;
        };
        if let RequestBody::Connect { identity } = &request.body {
            info!(conn = %conn, peer = %identity, "peer registered");
            ctx.set_peer_identity(conn, identity.clone());
            ctx.send(conn, Message::Response(Response::new(request.key.clone(), ResponseBody::Ok)));
        }
    }
}

/// Answers pings from anyone.
pub struct HandlePingJob;

impl Listener for HandlePingJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        let Some((conn, request)) = incoming_request(event) else {
            return;
        };
        if matches!(request.body, RequestBody::Ping) {
            debug!(conn = %conn, "ping");
            ctx.send(
                conn,
                Message::Response(Response::new(request.key.clone(), ResponseBody::Pong)),
            );
        }
    }
}

/// Stops the agent when a registered peer asks.
pub struct HandleShutdownJob;

impl Listener for HandleShutdownJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        let Some((conn, request)) = incoming_request(event) else {
            return;
        };
        if !matches!(request.body, RequestBody::Shutdown) {
            return;
        }
        if ctx.peer_identity(conn).is_none() {
            debug!(conn = %conn, "shutdown refused, peer not registered");
            ctx.send(
                conn,
                Message::Response(Response::new(request.key.clone(), ResponseBody::Denied)),
            );
            return;
        }
        info!(conn = %conn, "shutdown requested");
        ctx.send(conn, Message::Response(Response::new(request.key.clone(), ResponseBody::Ok)));
        ctx.request_shutdown();
    }
}

/// Reports the agent's state to registered peers.
pub struct HandleStatusJob {
    /// Include the registered peer list, as a director would.
    pub report_peers: bool,
}

impl Listener for HandleStatusJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        let Some((conn, request)) = incoming_request(event) else {
            return;
        };
        if !matches!(request.body, RequestBody::Status) {
            return;
        }
        if ctx.peer_identity(conn).is_none() {
            ctx.send(
                conn,
                Message::Response(Response::new(request.key.clone(), ResponseBody::Denied)),
            );
            return;
        }
        let agents = if self.report_peers {
            ctx.registered_connections()
                .into_iter()
                .filter_map(|id| ctx.peer_identity(id).cloned())
                .collect()
        } else {
            Vec::new()
        };
        let report = StatusReport {
            state: ctx.state(),
            identity: ctx.identity().clone(),
            details: ctx.config().status_details.clone(),
            agents,
        };
        ctx.send(
            conn,
            Message::Response(Response::new(request.key.clone(), ResponseBody::Status(report))),
        );
    }
}
