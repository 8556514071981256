//! The per-process reactor: state machine, connection set, event loop.
//!
//! One task owns everything. Each cycle of [`AgentReactor::run`]:
//!
//! 1. picks a wait budget — zero when queued events or buffered input
//!    are pending, else the nearest timer deadline, else unbounded;
//! 2. parks on socket readiness (and pending accepts) up to that budget;
//! 3. sweeps the timer set, queueing expired payloads;
//! 4. dispatches I/O readiness inline, bypassing the queue;
//! 5. if no I/O fired and the queue was non-empty, dispatches exactly
//!    one queued event.
//!
//! Dispatch always runs the reactor's own handling first, then offers
//! the event to every registered listener. Listeners mutate the reactor
//! through [`Context`]; additions and removals made mid-dispatch take
//! effect once the current event has been offered to everyone.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cadre_wire::{standard_registry, AgentIdentity, AgentState, Message, TypeRegistry};
use futures::future::{select_all, FutureExt, LocalBoxFuture};
use tokio::io::Interest;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::connection::{poll_once, Connection, ConnectionId, ReadOutcome, Socket};
use crate::error::AgentResult;
use crate::event::{Event, EventKind, EventQueue, EventSource, Listener, ListenerId};
use crate::timer::{Timer, TimerId, TimerSet};

struct ListenerEntry {
    id: ListenerId,
    listener: Box<dyn Listener>,
}

/// What ended the I/O wait.
enum IoWake {
    TimedOut,
    /// Some socket became ready; the readiness sweep will find it.
    Ready,
    /// A listener completed an accept during the wait. The stream is
    /// handed over here so it cannot be dropped on the floor.
    Accepted { listener: ConnectionId, stream: TcpStream, addr: SocketAddr },
}

pub struct AgentReactor {
    config: AgentConfig,
    registry: Arc<TypeRegistry>,
    state: AgentState,
    connections: BTreeMap<ConnectionId, Connection>,
    queue: EventQueue,
    timers: TimerSet,
    listeners: Vec<ListenerEntry>,
    next_connection: u64,
    next_listener: u64,
}

impl AgentReactor {
    /// Create a reactor and, when the identity carries an address, bind
    /// its listening socket. The reactor comes out in `Starting`.
    pub async fn bind(config: AgentConfig) -> AgentResult<Self> {
        let registry = standard_registry();
        let mut reactor = AgentReactor {
            config,
            registry,
            state: AgentState::Stopped,
            connections: BTreeMap::new(),
            queue: EventQueue::new(),
            timers: TimerSet::new(),
            listeners: Vec::new(),
            next_connection: 0,
            next_listener: 0,
        };
        reactor.set_state(AgentState::Starting);
        if let Some((host, port)) = reactor.config.identity.addr() {
            let listener = TcpListener::bind((host, port)).await?;
            let addr = listener.local_addr()?;
            info!(agent = %reactor.config.identity.name, %addr, "listening");
            let id = reactor.next_connection_id();
            let registry = reactor.registry.clone();
            reactor
                .connections
                .insert(id, Connection::listening(id, listener, registry));
        }
        Ok(reactor)
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<TypeRegistry> {
        self.registry.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Bound address of the listening socket, when there is one. Useful
    /// when the configured port was 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connections.values().find_map(|conn| match conn.socket() {
            Socket::Listening(listener) => listener.local_addr().ok(),
            _ => None,
        })
    }

    pub fn add_listener(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(ListenerEntry { id, listener });
        id
    }

    pub fn push_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn add_timer(&mut self, timer: Timer) -> TimerId {
        self.timers.add(timer)
    }

    /// Add a self-initiated connection that will dial `peer` on first
    /// send.
    pub fn open_connection(&mut self, peer: AgentIdentity) -> ConnectionId {
        let id = self.next_connection_id();
        let conn = Connection::to_peer(id, peer, self.registry.clone());
        self.connections.insert(id, conn);
        id
    }

    /// Disconnect and forget a connection.
    pub fn drop_connection(&mut self, id: ConnectionId) {
        if let Some(mut conn) = self.connections.remove(&id) {
            conn.disconnect();
            debug!(conn = %id, remaining = self.connections.len(), "connection dropped");
        }
    }

    /// Begin an orderly shutdown: drain the queue, then stop.
    pub fn shutdown(&mut self) {
        self.set_state(AgentState::Stopping);
    }

    fn next_connection_id(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        id
    }

    /// Announce a transition, then apply it. The announcement happens
    /// even when `new` equals the current state; the machine itself only
    /// ever moves forward.
    fn set_state(&mut self, new: AgentState) {
        let old = self.state;
        self.queue
            .push(Event::new(EventSource::Reactor, EventKind::StateChanged { old, new }));
        if old != new {
            info!(agent = %self.config.identity.name, %old, %new, "state change");
            self.state = new;
        }
    }

    /// Run to completion: cycle until the state leaves `Running` and the
    /// queue is drained.
    pub async fn run(&mut self) -> AgentResult<()> {
        self.set_state(AgentState::Running);
        while self.state == AgentState::Running || !self.queue.is_empty() {
            self.cycle().await?;
        }
        info!(agent = %self.config.identity.name, "reactor stopped");
        Ok(())
    }

    async fn cycle(&mut self) -> AgentResult<()> {
        let queue_pending = !self.queue.is_empty();
        let buffered_input = self.connections.values().any(|c| c.has_buffered_input());
        let budget = if queue_pending || buffered_input {
            Some(Duration::ZERO)
        } else {
            self.timers.next_timeout()
        };

        let wake = self.wait_for_io(budget).await;

        for payload in self.timers.poll_expired(Instant::now()) {
            self.queue.push(payload);
        }

        // Readiness sweep over a snapshot of the connection set.
        let mut accepted: Vec<(ConnectionId, TcpStream, SocketAddr)> = Vec::new();
        let mut failed: Vec<ConnectionId> = Vec::new();
        let mut writable: Vec<ConnectionId> = Vec::new();
        let mut readable: Vec<ConnectionId> = Vec::new();

        if let IoWake::Accepted { listener, stream, addr } = wake {
            accepted.push((listener, stream, addr));
        }

        for conn in self.connections.values() {
            match conn.socket() {
                Socket::Listening(listener) => {
                    while let Some(result) = poll_once(listener.accept()) {
                        match result {
                            Ok((stream, addr)) => accepted.push((conn.id(), stream, addr)),
                            Err(err) => {
                                warn!(conn = %conn.id(), error = %err, "accept failed");
                                break;
                            }
                        }
                    }
                }
                Socket::Stream(stream) => {
                    let mut interest = Interest::READABLE;
                    if conn.is_write_pending() {
                        interest = interest | Interest::WRITABLE;
                    }
                    if let Some(Ok(ready)) = poll_once(stream.ready(interest)) {
                        if ready.is_error() {
                            failed.push(conn.id());
                            continue;
                        }
                        if ready.is_writable() && conn.is_write_pending() {
                            writable.push(conn.id());
                        }
                        if ready.is_readable() {
                            readable.push(conn.id());
                        }
                    }
                    if conn.has_buffered_input() && !readable.contains(&conn.id()) {
                        readable.push(conn.id());
                    }
                }
                Socket::Disconnected => {}
            }
        }

        let had_io =
            !(accepted.is_empty() && failed.is_empty() && writable.is_empty() && readable.is_empty());

        for id in failed {
            self.dispatch(Event::new(EventSource::Connection(id), EventKind::ConnectionFailed))
                .await?;
        }
        for id in writable {
            self.dispatch(Event::new(EventSource::Connection(id), EventKind::ConnectionWritable))
                .await?;
        }
        for (listener, stream, addr) in accepted {
            let event = self.install_accepted(listener, stream, addr);
            self.dispatch(event).await?;
        }
        for id in readable {
            self.dispatch(Event::new(EventSource::Connection(id), EventKind::ConnectionReadable))
                .await?;
        }

        if queue_pending && !had_io {
            if let Some(event) = self.queue.pop() {
                self.dispatch(event).await?;
            }
        }
        Ok(())
    }

    /// Park until a socket is ready, an accept completes, or the budget
    /// runs out. `None` parks indefinitely.
    async fn wait_for_io(&self, budget: Option<Duration>) -> IoWake {
        if budget == Some(Duration::ZERO) {
            return IoWake::TimedOut;
        }
        let mut waits: Vec<LocalBoxFuture<'_, IoWake>> = Vec::new();
        for conn in self.connections.values() {
            match conn.socket() {
                Socket::Listening(listener) => {
                    let id = conn.id();
                    waits.push(
                        async move {
                            match listener.accept().await {
                                Ok((stream, addr)) => {
                                    IoWake::Accepted { listener: id, stream, addr }
                                }
                                Err(err) => {
                                    warn!(conn = %id, error = %err, "accept failed");
                                    IoWake::Ready
                                }
                            }
                        }
                        .boxed_local(),
                    );
                }
                Socket::Stream(stream) => {
                    let mut interest = Interest::READABLE;
                    if conn.is_write_pending() {
                        interest = interest | Interest::WRITABLE;
                    }
                    waits.push(
                        async move {
                            let _ = stream.ready(interest).await;
                            IoWake::Ready
                        }
                        .boxed_local(),
                    );
                }
                Socket::Disconnected => {}
            }
        }
        if waits.is_empty() {
            return match budget {
                Some(budget) => {
                    tokio::time::sleep(budget).await;
                    IoWake::TimedOut
                }
                None => futures::future::pending().await,
            };
        }
        let race = select_all(waits);
        match budget {
            Some(budget) => match tokio::time::timeout(budget, race).await {
                Ok((wake, _, _)) => wake,
                Err(_) => IoWake::TimedOut,
            },
            None => race.await.0,
        }
    }

    fn install_accepted(
        &mut self,
        listener: ConnectionId,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> Event {
        let id = self.next_connection_id();
        let conn = Connection::accepted(id, stream, self.registry.clone());
        self.connections.insert(id, conn);
        info!(%addr, conn = %id, "accepted connection");
        Event::new(EventSource::Connection(listener), EventKind::Connected { conn: id })
    }

    /// Reactor-level handling, always ahead of the listeners.
    async fn dispatch(&mut self, event: Event) -> AgentResult<()> {
        match (&event.source, &event.kind) {
            (EventSource::Connection(id), EventKind::ConnectionReadable) => {
                self.handle_readable(*id);
            }
            (EventSource::Connection(id), EventKind::ConnectionWritable) => {
                if let Some(conn) = self.connections.get_mut(id) {
                    conn.flush();
                }
            }
            (EventSource::Connection(id), EventKind::ConnectionFailed) => {
                warn!(conn = %id, "connection failed");
                self.drop_connection(*id);
            }
            (_, EventKind::MessageSend { target, message }) => {
                self.handle_send(*target, message).await;
            }
            (_, EventKind::StateChanged { old, new }) => {
                debug!(%old, %new, "state change dispatched");
            }
            _ => {}
        }
        self.notify_listeners(&event);
        Ok(())
    }

    fn handle_readable(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        match conn.read() {
            Ok(ReadOutcome::Message(message)) => {
                debug!(conn = %id, "message received");
                self.queue.push(Event::new(
                    EventSource::Connection(id),
                    EventKind::MessageReceived { message },
                ));
            }
            Ok(ReadOutcome::Accepted(stream, addr)) => {
                let event = self.install_accepted(id, stream, addr);
                self.queue.push(event);
            }
            Ok(ReadOutcome::NeedMore) => {}
            Ok(ReadOutcome::Disconnected) => {
                debug!(conn = %id, "peer disconnected");
            }
            Err(err) => {
                warn!(conn = %id, error = %err, "protocol error, dropping connection");
                self.drop_connection(id);
            }
        }
    }

    async fn handle_send(&mut self, target: ConnectionId, message: &Message) {
        let Some(conn) = self.connections.get_mut(&target) else {
            warn!(conn = %target, "send to unknown connection, dropping message");
            return;
        };
        let encoded = message.encode();
        if let Err(err) = conn.send(encoded.as_bytes()).await {
            warn!(conn = %target, error = %err, "send failed");
        }
    }

    /// Offer `event` to every listener registered at the start of the
    /// dispatch. Listeners added during it are deferred to the next
    /// event; removals apply afterwards.
    fn notify_listeners(&mut self, event: &Event) {
        let mut active = std::mem::take(&mut self.listeners);
        let mut dropped: Vec<ListenerId> = Vec::new();
        for entry in active.iter_mut() {
            if dropped.contains(&entry.id) {
                continue;
            }
            let mut ctx = Context { reactor: self, self_id: entry.id, dropped: &mut dropped };
            entry.listener.notify(event, &mut ctx);
        }
        let mut added = std::mem::take(&mut self.listeners);
        active.append(&mut added);
        if !dropped.is_empty() {
            active.retain(|entry| !dropped.contains(&entry.id));
        }
        self.listeners = active;
    }
}

/// A listener's handle on the reactor during dispatch.
pub struct Context<'a> {
    reactor: &'a mut AgentReactor,
    self_id: ListenerId,
    dropped: &'a mut Vec<ListenerId>,
}

impl Context<'_> {
    pub fn self_id(&self) -> ListenerId {
        self.self_id
    }

    pub fn state(&self) -> AgentState {
        self.reactor.state
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.reactor.config.identity
    }

    pub fn config(&self) -> &AgentConfig {
        &self.reactor.config
    }

    pub fn push_event(&mut self, event: Event) {
        self.reactor.queue.push(event);
    }

    /// Queue a message for `target`, attributed to this listener.
    pub fn send(&mut self, target: ConnectionId, message: Message) {
        let source = EventSource::Listener(self.self_id);
        self.push_event(Event::new(source, EventKind::MessageSend { target, message }));
    }

    pub fn add_timer(&mut self, timer: Timer) -> TimerId {
        self.reactor.timers.add(timer)
    }

    pub fn stop_timer(&mut self, id: TimerId) {
        self.reactor.timers.stop(id);
    }

    pub fn add_listener(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        self.reactor.add_listener(listener)
    }

    /// Unregister a listener once this dispatch completes.
    pub fn drop_listener(&mut self, id: ListenerId) {
        self.dropped.push(id);
    }

    pub fn drop_self(&mut self) {
        let id = self.self_id;
        self.drop_listener(id);
    }

    pub fn open_connection(&mut self, peer: AgentIdentity) -> ConnectionId {
        self.reactor.open_connection(peer)
    }

    pub fn drop_connection(&mut self, id: ConnectionId) {
        self.reactor.drop_connection(id);
    }

    pub fn peer_identity(&self, id: ConnectionId) -> Option<&AgentIdentity> {
        self.reactor.connections.get(&id).and_then(|c| c.peer())
    }

    pub fn set_peer_identity(&mut self, id: ConnectionId, identity: AgentIdentity) {
        if let Some(conn) = self.reactor.connections.get_mut(&id) {
            conn.set_peer(identity);
        }
    }

    /// Snapshot of stream connections with a known peer identity.
    pub fn registered_connections(&self) -> Vec<ConnectionId> {
        self.reactor
            .connections
            .values()
            .filter(|c| !c.is_listening() && c.peer().is_some())
            .map(|c| c.id())
            .collect()
    }

    pub fn request_shutdown(&mut self) {
        self.reactor.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_transition_is_still_announced() {
        let mut reactor = AgentReactor::bind(AgentConfig::default()).await.unwrap();
        assert_eq!(reactor.state(), AgentState::Starting);
        // Queue now holds Stopped -> Starting.
        assert!(matches!(
            reactor.queue.pop().map(|e| e.kind),
            Some(EventKind::StateChanged { old: AgentState::Stopped, new: AgentState::Starting })
        ));

        reactor.set_state(AgentState::Starting);
        assert_eq!(reactor.state(), AgentState::Starting);
        assert!(matches!(
            reactor.queue.pop().map(|e| e.kind),
            Some(EventKind::StateChanged { old: AgentState::Starting, new: AgentState::Starting })
        ));
    }

    #[tokio::test]
    async fn default_identity_binds_no_socket() {
        let reactor = AgentReactor::bind(AgentConfig::default()).await.unwrap();
        assert_eq!(reactor.connection_count(), 0);
        assert_eq!(reactor.local_addr(), None);
    }

    #[tokio::test]
    async fn listener_added_mid_dispatch_misses_the_current_event() {
        struct Adder;
        impl Listener for Adder {
            fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
                if matches!(event.kind, EventKind::PingDue) {
                    ctx.add_listener(Box::new(Recorder));
                }
            }
        }
        struct Recorder;
        impl Listener for Recorder {
            fn notify(&mut self, event: &Event, _ctx: &mut Context<'_>) {
                assert!(
                    !matches!(event.kind, EventKind::PingDue),
                    "listener saw the event that created it"
                );
            }
        }

        let mut reactor = AgentReactor::bind(AgentConfig::default()).await.unwrap();
        reactor.add_listener(Box::new(Adder));
        reactor
            .dispatch(Event::new(EventSource::Reactor, EventKind::PingDue))
            .await
            .unwrap();
        assert_eq!(reactor.listeners.len(), 2);
    }

    #[tokio::test]
    async fn listener_can_drop_itself() {
        struct OneShot;
        impl Listener for OneShot {
            fn notify(&mut self, event: &Event, ctx: &mut Context<'_>) {
                if matches!(event.kind, EventKind::PingDue) {
                    ctx.drop_self();
                }
            }
        }
        let mut reactor = AgentReactor::bind(AgentConfig::default()).await.unwrap();
        reactor.add_listener(Box::new(OneShot));
        reactor
            .dispatch(Event::new(EventSource::Reactor, EventKind::PingDue))
            .await
            .unwrap();
        assert!(reactor.listeners.is_empty());
    }
}
