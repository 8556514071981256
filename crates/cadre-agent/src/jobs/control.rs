//! One-shot command jobs used by the command-line tools.
//!
//! Each runs after a [`ConnectJob`](crate::jobs::ConnectJob) has
//! registered us with the target agent, sends a single request, reports
//! the answer through a oneshot channel, and stops the reactor.

use cadre_wire::{
    CorrelationKey, Message, Request, RequestBody, ResponseBody, StatusReport,
};
use tokio::sync::oneshot;
use tracing::warn;

use crate::event::{Event, EventKind, EventSource, Listener, ListenerId};
use crate::reactor::Context;

/// How a command conversation ended.
#[derive(Debug)]
pub enum ControlOutcome {
    Acknowledged,
    Denied,
    Status(StatusReport),
    ConnectFailed,
}

/// Shared plumbing: watch our ConnectJob, send one request, await the
/// matching response.
struct CommandState {
    connect_job: ListenerId,
    outcome: Option<oneshot::Sender<ControlOutcome>>,
    awaiting: Option<CorrelationKey>,
}

impl CommandState {
    fn new(connect_job: ListenerId, outcome: oneshot::Sender<ControlOutcome>) -> Self {
        CommandState { connect_job, outcome: Some(outcome), awaiting: None }
    }

    fn finish(&mut self, outcome: ControlOutcome, ctx: &mut Context<'_>) {
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(outcome);
        }
        ctx.request_shutdown();
        ctx.drop_self();
    }

    /// Send `body` once our ConnectJob reports success; true when the
    /// conversation should continue.
    fn on_event(&mut self, event: &Event, body: RequestBody, ctx: &mut Context<'_>) -> bool {
        match &event.kind {
            EventKind::ConnectComplete { conn }
                if event.source == EventSource::Listener(self.connect_job) =>
            {
                let request = Request::new(body);
                self.awaiting = Some(request.key.clone());
                ctx.send(*conn, Message::Request(request));
                true
            }
            EventKind::ConnectFailed
                if event.source == EventSource::Listener(self.connect_job) =>
            {
                warn!("could not reach the target agent");
                self.finish(ControlOutcome::ConnectFailed, ctx);
                false
            }
            _ => true,
        }
    }

    fn matching_response<'e>(&self, event: &'e Event) -> Option<&'e ResponseBody> {
        let EventKind::MessageReceived { message: Message::Response(response) } = &event.kind
        else {
            return None;
        };
        (self.awaiting.as_ref() == Some(&response.key)).then_some(&response.body)
    }
}

/// Asks the target agent to shut down.
pub struct ShutdownCommandJob {
    state: CommandState,
}

impl ShutdownCommandJob {
    pub fn new(connect_job: ListenerId, outcome: oneshot::Sender<ControlOutcome>) -> Self {
        ShutdownCommandJob { state: CommandState::new(connect_job, outcome) }
    }
}

impl Listener for ShutdownCommandJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        if !self.state.on_event(event, RequestBody::Shutdown, ctx) {
            return;
        }
        let outcome = match self.state.matching_response(event) {
            Some(ResponseBody::Ok) => ControlOutcome::Acknowledged,
            Some(ResponseBody::Denied) => ControlOutcome::Denied,
            _ => return,
        };
        self.state.finish(outcome, ctx);
    }
}

/// Queries the target agent's status.
pub struct StatusCommandJob {
    state: CommandState,
}

impl StatusCommandJob {
    pub fn new(connect_job: ListenerId, outcome: oneshot::Sender<ControlOutcome>) -> Self {
        StatusCommandJob { state: CommandState::new(connect_job, outcome) }
    }
}

impl Listener for StatusCommandJob {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
        if !self.state.on_event(event, RequestBody::Status, ctx) {
            return;
        }
        let outcome = match self.state.matching_response(event) {
            Some(ResponseBody::Status(report)) => ControlOutcome::Status(report.clone()),
            Some(ResponseBody::Denied) => ControlOutcome::Denied,
            _ => return,
        };
        self.state.finish(outcome, ctx);
    }
}
