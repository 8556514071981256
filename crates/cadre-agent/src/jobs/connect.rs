//! Registration with a director, with retries.

use cadre_wire::{AgentIdentity, CorrelationKey, Message, Request, RequestBody, ResponseBody};
use tracing::{debug, info, warn};

use crate::config::ConnectConfig;
use crate::connection::ConnectionId;
use crate::event::{Event, EventKind, EventSource, Listener};
use crate::reactor::Context;
use crate::timer::{Timer, TimerId};

struct Attempt {
    key: CorrelationKey,
    conn: ConnectionId,
    timer: TimerId,
}

/// Dials the target, sends a connect request, and waits for the answer.
///
/// Every retry starts over: the stale connection is dropped and a fresh
/// one is dialled under a fresh key, so a late answer to an abandoned
/// attempt cannot be mistaken for the current one. The job announces
/// `ConnectComplete` or `ConnectFailed` under its own id and then
/// unregisters itself; `Denied` stops the whole agent.
pub struct ConnectJob {
    target: AgentIdentity,
    config: ConnectConfig,
    attempt: Option<Attempt>,
    retries: u32,
}

impl ConnectJob {
    pub fn new(target: AgentIdentity, config: ConnectConfig) -> Self {
        ConnectJob { target, config, attempt: None, retries: 0 }
    }

    fn attempt(&mut self, ctx: &mut Context<'_>) {
        let conn = ctx.open_connection(self.target.clone());
        let request = Request::new(RequestBody::Connect { identity: ctx.identity().clone() });
        let key = request.key.clone();
        debug!(target = %self.target, conn = %conn, retry = self.retries, "registering");
        ctx.send(conn, Message::Request(request));
        let timer = ctx.add_timer(Timer::new(
            self.config.retry_interval,
            Event::new(EventSource::Listener(ctx.self_id()), EventKind::ConnectRetry),
        ));
        self.attempt = Some(Attempt { key, conn, timer });
    }

    fn retry(&mut self, ctx: &mut Context<'_>) {
        if let Some(attempt) = self.attempt.take() {
            ctx.stop_timer(attempt.timer);
            ctx.drop_connection(attempt.conn);
        }
        self.retries += 1;
        if self.config.max_retries.is_some_and(|max| self.retries > max) {
            warn!(target = %self.target, "registration abandoned");
            ctx.push_event(Event::new(
                EventSource::Listener(ctx.self_id()),
                EventKind::ConnectFailed,
            ));
            ctx.drop_self();
            return;
        }
        self.attempt(ctx);
    }
}

impl Listener for ConnectJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        match &event.kind {
            EventKind::RunListener { listener } if *listener == ctx.self_id() => {
                self.attempt(ctx);
            }
            EventKind::ConnectRetry
                if event.source == EventSource::Listener(ctx.self_id()) =>
            {
                self.retry(ctx);
            }
            EventKind::MessageReceived { message: Message::Response(response) } => {
                let Some(attempt) = &self.attempt else {
                    return;
                };
                if response.key != attempt.key {
                    return;
                }
                match response.body {
                    ResponseBody::Ok => {
                        info!(target = %self.target, "registered with director");
                        ctx.stop_timer(attempt.timer);
                        let conn = attempt.conn;
                        self.attempt = None;
                        ctx.push_event(Event::new(
                            EventSource::Listener(ctx.self_id()),
                            EventKind::ConnectComplete { conn },
                        ));
                        ctx.drop_self();
                    }
                    ResponseBody::Denied => {
                        warn!(target = %self.target, "registration denied, stopping");
                        ctx.stop_timer(attempt.timer);
                        self.attempt = None;
                        ctx.request_shutdown();
                        ctx.drop_self();
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
