//! Director-side shutdown: broadcast and wait for the fleet.

use std::collections::HashMap;

use cadre_wire::{CorrelationKey, Message, Request, RequestBody, Response, ResponseBody};
use tracing::{debug, info, warn};

use crate::connection::ConnectionId;
use crate::event::{Event, EventKind, EventSource, Listener};
use crate::reactor::Context;

/// The director's replacement for the plain shutdown handler.
///
/// A shutdown request from a registered peer is acknowledged, then
/// forwarded to every registered connection. The director stops once
/// each of them has answered or has been dropped by the heartbeat, so a
/// wedged agent delays shutdown by at most one ping round.
#[derive(Default)]
pub struct ShutdownBroadcastJob {
    /// Connections still owing an answer, by the key we used. `None`
    /// until a shutdown has been requested.
    pending: Option<HashMap<ConnectionId, CorrelationKey>>,
}

impl ShutdownBroadcastJob {
    pub fn new() -> Self {
        ShutdownBroadcastJob::default()
    }

    fn begin(&mut self, requester: ConnectionId, key: CorrelationKey, ctx: &mut Context<'_>) {
        ctx.send(requester, Message::Response(Response::new(key, ResponseBody::Ok)));
        if self.pending.is_some() {
            debug!("shutdown already in progress");
            return;
        }
        info!(conn = %requester, "broadcasting shutdown");
        let mut pending = HashMap::new();
        for conn in ctx.registered_connections() {
            let request = Request::new(RequestBody::Shutdown);
            pending.insert(conn, request.key.clone());
            ctx.send(conn, Message::Request(request));
        }
        self.pending = Some(pending);
        self.maybe_finish(ctx);
    }

    fn maybe_finish(&mut self, ctx: &mut Context<'_>) {
        if self.pending.as_ref().is_some_and(|p| p.is_empty()) {
            info!("all agents accounted for, stopping");
            ctx.request_shutdown();
        }
    }
}

impl Listener for ShutdownBroadcastJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        let EventSource::Connection(conn) = event.source else {
            return;
        };
        match &event.kind {
            EventKind::MessageReceived { message: Message::Request(request) }
                if matches!(request.body, RequestBody::Shutdown) =>
            {
                if ctx.peer_identity(conn).is_none() {
                    debug!(conn = %conn, "shutdown refused, peer not registered");
                    ctx.send(
                        conn,
                        Message::Response(Response::new(
                            request.key.clone(),
                            ResponseBody::Denied,
                        )),
                    );
                    return;
                }
                self.begin(conn, request.key.clone(), ctx);
            }
            EventKind::MessageReceived { message: Message::Response(response) } => {
                let Some(pending) = &mut self.pending else {
                    return;
                };
                if pending.get(&conn) != Some(&response.key) {
                    return;
                }
                match response.body {
                    ResponseBody::Ok => info!(conn = %conn, "agent acknowledged shutdown"),
                    _ => warn!(conn = %conn, "unexpected answer to shutdown, counting it"),
                }
                pending.remove(&conn);
                self.maybe_finish(ctx);
            }
            EventKind::PingTimeout { conn } => {
                let Some(pending) = &mut self.pending else {
                    return;
                };
                if pending.remove(conn).is_some() {
                    info!(conn = %conn, "agent went away before acknowledging");
                    self.maybe_finish(ctx);
                }
            }
            _ => {}
        }
    }
}
