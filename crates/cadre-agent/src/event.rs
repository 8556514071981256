//! The event substrate: a FIFO queue plus the listener contract.
//!
//! Everything that happens inside an agent is an [`Event`]. Events raised
//! by jobs and timers flow through the [`EventQueue`] and are delivered
//! one per reactor cycle; I/O readiness events skip the queue and are
//! dispatched inline. Either way, every event is offered to every
//! registered [`Listener`].

use std::collections::VecDeque;
use std::fmt;

use cadre_wire::{AgentState, Message};

use crate::connection::ConnectionId;
use crate::reactor::Context;

/// Handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Who raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// The reactor itself.
    Reactor,
    /// A connection, by id.
    Connection(ConnectionId),
    /// A listener, by id.
    Listener(ListenerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub source: EventSource,
    pub kind: EventKind,
}

impl Event {
    pub fn new(source: EventSource, kind: EventKind) -> Self {
        Event { source, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Bytes (or a pending accept) are waiting on the source connection.
    ConnectionReadable,
    /// The source connection can take more outbound bytes.
    ConnectionWritable,
    /// The source connection's socket reported an error condition.
    ConnectionFailed,
    /// A new inbound connection was accepted by the source listener.
    Connected { conn: ConnectionId },
    /// A complete message arrived on the source connection.
    MessageReceived { message: Message },
    /// Ask the reactor to encode and send a message.
    MessageSend { target: ConnectionId, message: Message },
    /// The reactor announced a state transition. Fired even when
    /// `old == new`; subscribers must tolerate the repeat.
    StateChanged { old: AgentState, new: AgentState },
    /// Kick a specific listener into action.
    RunListener { listener: ListenerId },
    /// Time to ping the registered peers.
    PingDue,
    /// A ping on `conn` went unanswered.
    PingTimeout { conn: ConnectionId },
    /// A registration attempt should be retried.
    ConnectRetry,
    /// Registration with the director succeeded over `conn`.
    ConnectComplete { conn: ConnectionId },
    /// Registration was abandoned after exhausting retries.
    ConnectFailed,
}

/// Strict FIFO queue of pending events.
#[derive(Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A subscriber to the event stream.
///
/// Listeners see every event and use the [`Context`] to act: queue more
/// events, arm timers, open or drop connections, or unregister
/// themselves. Jobs are just listeners that track conversation state.
pub trait Listener: Send {
    fn notify(&mut self, event: &Event, ctx: &mut Context<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let mut queue = EventQueue::new();
        for i in 0..4 {
            queue.push(Event::new(
                EventSource::Reactor,
                EventKind::RunListener { listener: ListenerId(i) },
            ));
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|e| match e.kind {
                EventKind::RunListener { listener } => listener.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }
}
