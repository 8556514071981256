//! Periodic heartbeat of every registered connection.

use std::collections::HashMap;

use cadre_wire::{CorrelationKey, Message, Request, RequestBody, ResponseBody};
use tracing::{debug, warn};

use crate::config::PingConfig;
use crate::connection::ConnectionId;
use crate::event::{Event, EventKind, EventSource, Listener};
use crate::reactor::Context;
use crate::timer::{Timer, TimerId};

struct Outstanding {
    conn: ConnectionId,
    timer: TimerId,
}

/// On every `PingDue`, pings each registered connection and arms a
/// timeout per ping. A pong in time cancels its timeout; a timeout drops
/// the connection. The interval timer is re-armed at the start of each
/// round, so the job keeps running until the reactor stops.
///
/// Kick it off by queueing one `PingDue` timer against the job's id;
/// [`install`](PingJob::install) does both.
pub struct PingJob {
    config: PingConfig,
    outstanding: HashMap<CorrelationKey, Outstanding>,
}

impl PingJob {
    pub fn new(config: PingConfig) -> Self {
        PingJob { config, outstanding: HashMap::new() }
    }

    /// Register the job and arm its first interval timer.
    pub fn install(reactor: &mut crate::reactor::AgentReactor, config: PingConfig) {
        let interval = config.interval;
        let id = reactor.add_listener(Box::new(PingJob::new(config)));
        reactor.add_timer(Timer::new(
            interval,
            Event::new(EventSource::Listener(id), EventKind::PingDue),
        ));
    }

    fn ping_round(&mut self, ctx: &mut Context<'_>) {
        for conn in ctx.registered_connections() {
            let request = Request::new(RequestBody::Ping);
            let timer = ctx.add_timer(Timer::new(
                self.config.timeout,
                Event::new(EventSource::Connection(conn), EventKind::PingTimeout { conn }),
            ));
            self.outstanding.insert(request.key.clone(), Outstanding { conn, timer });
            ctx.send(conn, Message::Request(request));
        }
        ctx.add_timer(Timer::new(
            self.config.interval,
            Event::new(EventSource::Listener(ctx.self_id()), EventKind::PingDue),
        ));
    }
}

impl Listener for PingJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        match &event.kind {
            EventKind::PingDue if event.source == EventSource::Listener(ctx.self_id()) => {
                self.ping_round(ctx);
            }
            EventKind::PingTimeout { conn } => {
                warn!(conn = %conn, "ping unanswered, dropping connection");
                ctx.drop_connection(*conn);
                self.outstanding.retain(|_, o| o.conn != *conn);
            }
            EventKind::MessageReceived { message: Message::Response(response) }
                if matches!(response.body, ResponseBody::Pong) =>
            {
                match self.outstanding.remove(&response.key) {
                    Some(outstanding) => {
                        debug!(conn = %outstanding.conn, "pong");
                        ctx.stop_timer(outstanding.timer);
                    }
                    // Stale or mismatched key: log and carry on.
                    None => debug!(key = %response.key, "pong with unknown key, ignoring"),
                }
            }
            _ => {}
        }
    }
}
