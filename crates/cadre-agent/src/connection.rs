//! One socket, its buffers, and its decoder.
//!
//! A [`Connection`] is one of three things: a listening socket waiting to
//! accept peers, an accepted inbound stream, or a self-initiated stream
//! dialled from a peer identity. Self-initiated connections dial lazily:
//! the first send on a disconnected connection triggers the connect.
//!
//! All socket I/O here is non-blocking and best-effort. A read drains
//! whatever the kernel has and surfaces at most one decoded message; a
//! send writes what the socket will take and retains the rest for a later
//! writability event.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use cadre_wire::{
    AgentIdentity, FeedOutcome, Message, StreamDecoder, TypeRegistry, WireValue,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult};

/// Bytes pulled off the socket per read call.
const READ_CHUNK: usize = 1024;

/// Handle for a connection in the reactor's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub(crate) u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The socket behind a connection, if any.
pub enum Socket {
    Listening(TcpListener),
    Stream(TcpStream),
    Disconnected,
}

/// What one read produced.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Nothing complete yet.
    NeedMore,
    /// One decoded message; more bytes may still be buffered.
    Message(Message),
    /// A listening socket accepted an inbound stream.
    Accepted(TcpStream, SocketAddr),
    /// The peer went away; buffers were discarded.
    Disconnected,
}

pub struct Connection {
    id: ConnectionId,
    socket: Socket,
    /// Peer identity: preset for self-initiated connections, learned
    /// from the connect handshake for accepted ones.
    peer: Option<AgentIdentity>,
    self_initiated: bool,
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    decoder: StreamDecoder,
    registry: Arc<TypeRegistry>,
}

impl Connection {
    pub fn listening(id: ConnectionId, listener: TcpListener, registry: Arc<TypeRegistry>) -> Self {
        Connection {
            id,
            socket: Socket::Listening(listener),
            peer: None,
            self_initiated: false,
            inbound: Vec::new(),
            outbound: Vec::new(),
            decoder: StreamDecoder::new(registry.clone()),
            registry,
        }
    }

    pub fn accepted(id: ConnectionId, stream: TcpStream, registry: Arc<TypeRegistry>) -> Self {
        Connection {
            id,
            socket: Socket::Stream(stream),
            peer: None,
            self_initiated: false,
            inbound: Vec::new(),
            outbound: Vec::new(),
            decoder: StreamDecoder::new(registry.clone()),
            registry,
        }
    }

    /// A connection that will dial `peer` on first send.
    pub fn to_peer(id: ConnectionId, peer: AgentIdentity, registry: Arc<TypeRegistry>) -> Self {
        Connection {
            id,
            socket: Socket::Disconnected,
            peer: Some(peer),
            self_initiated: true,
            inbound: Vec::new(),
            outbound: Vec::new(),
            decoder: StreamDecoder::new(registry.clone()),
            registry,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn peer(&self) -> Option<&AgentIdentity> {
        self.peer.as_ref()
    }

    pub fn set_peer(&mut self, identity: AgentIdentity) {
        self.peer = Some(identity);
    }

    pub fn is_self_initiated(&self) -> bool {
        self.self_initiated
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.socket, Socket::Listening(_))
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.socket, Socket::Disconnected)
    }

    /// Connected streams always want readability; listeners want accepts.
    pub fn is_read_pending(&self) -> bool {
        self.is_connected()
    }

    /// True while retained outbound bytes are waiting on the socket.
    pub fn is_write_pending(&self) -> bool {
        matches!(self.socket, Socket::Stream(_)) && !self.outbound.is_empty()
    }

    /// Undecoded inbound bytes are waiting; the connection is readable
    /// without the socket saying so.
    pub fn has_buffered_input(&self) -> bool {
        !self.inbound.is_empty()
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Drain the socket and decode at most one message.
    ///
    /// Socket errors and EOF disconnect the connection and report
    /// [`ReadOutcome::Disconnected`]; the connection object itself stays
    /// alive. A decode error is returned and the caller is expected to
    /// drop the connection, since the stream cannot be resynchronised.
    pub fn read(&mut self) -> Result<ReadOutcome, AgentError> {
        match &self.socket {
            Socket::Listening(listener) => match poll_once(listener.accept()) {
                Some(Ok((stream, addr))) => Ok(ReadOutcome::Accepted(stream, addr)),
                Some(Err(err)) => {
                    warn!(conn = %self.id, error = %err, "accept failed");
                    Ok(ReadOutcome::NeedMore)
                }
                None => Ok(ReadOutcome::NeedMore),
            },
            Socket::Stream(_) => self.read_stream(),
            Socket::Disconnected => Ok(ReadOutcome::NeedMore),
        }
    }

    fn read_stream(&mut self) -> Result<ReadOutcome, AgentError> {
        loop {
            // Decode buffered bytes before touching the socket.
            while !self.inbound.is_empty() {
                match self.decoder.feed(&self.inbound)? {
                    FeedOutcome::Complete { value, consumed } => {
                        self.inbound.drain(..consumed);
                        if let Some(message) = self.into_message(value)? {
                            return Ok(ReadOutcome::Message(message));
                        }
                    }
                    FeedOutcome::NeedMoreInput => {
                        self.inbound.clear();
                        break;
                    }
                }
            }

            let Socket::Stream(stream) = &self.socket else {
                return Ok(ReadOutcome::NeedMore);
            };
            let mut chunk = [0u8; READ_CHUNK];
            match stream.try_read(&mut chunk) {
                Ok(0) => {
                    debug!(conn = %self.id, "peer closed the connection");
                    self.disconnect();
                    return Ok(ReadOutcome::Disconnected);
                }
                Ok(n) => {
                    self.inbound.extend_from_slice(&chunk[..n]);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::NeedMore);
                }
                Err(err) => {
                    warn!(conn = %self.id, error = %err, "socket read failed");
                    self.disconnect();
                    return Ok(ReadOutcome::Disconnected);
                }
            }
        }
    }

    /// A decoded top-level value becomes a message, or is discarded.
    fn into_message(&self, value: WireValue) -> Result<Option<Message>, AgentError> {
        match value {
            WireValue::Object(obj) => match self.registry.instantiate(&obj)? {
                Some(message) => Ok(Some(message)),
                None => {
                    debug!(conn = %self.id, class = %obj.class, "discarding non-message object");
                    Ok(None)
                }
            },
            other => {
                debug!(conn = %self.id, ?other, "discarding non-object value");
                Ok(None)
            }
        }
    }

    /// Queue bytes and push as much as the socket will take.
    ///
    /// A disconnected self-initiated connection dials its peer first; if
    /// the dial fails the bytes stay queued for a retry on a later send.
    pub async fn send(&mut self, bytes: &[u8]) -> AgentResult<()> {
        self.outbound.extend_from_slice(bytes);
        if !self.is_connected() {
            if self.peer.as_ref().and_then(|p| p.addr()).is_none() {
                return Err(AgentError::NoPeerAddress { peer: self.peer_name().to_owned() });
            }
            if let Err(err) = self.connect().await {
                debug!(conn = %self.id, error = %err, "connect deferred");
                return Ok(());
            }
        }
        self.flush();
        Ok(())
    }

    /// One non-blocking write of the retained outbound bytes.
    pub fn flush(&mut self) {
        let Socket::Stream(stream) = &self.socket else {
            return;
        };
        if self.outbound.is_empty() {
            return;
        }
        match stream.try_write(&self.outbound) {
            Ok(n) => {
                self.outbound.drain(..n);
                debug!(conn = %self.id, sent = n, retained = self.outbound.len(), "flushed");
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => {
                warn!(conn = %self.id, error = %err, "socket write failed");
                self.disconnect();
            }
        }
    }

    /// Dial the peer address. No-op when already connected.
    pub async fn connect(&mut self) -> AgentResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let (host, port) = match self.peer.as_ref().and_then(|p| p.addr()) {
            Some((host, port)) => (host.to_owned(), port),
            None => {
                return Err(AgentError::NoPeerAddress { peer: self.peer_name().to_owned() });
            }
        };
        self.self_initiated = true;
        match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => {
                debug!(conn = %self.id, %host, port, "connected");
                self.socket = Socket::Stream(stream);
                Ok(())
            }
            Err(source) => {
                Err(AgentError::Connect { peer: format!("{host}:{port}"), source })
            }
        }
    }

    /// Close the socket and discard all buffered state.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        debug!(conn = %self.id, peer = %self.peer_name(), "disconnecting");
        self.socket = Socket::Disconnected;
        self.self_initiated = false;
        self.inbound.clear();
        self.outbound.clear();
        self.decoder.reset();
    }

    fn peer_name(&self) -> &str {
        self.peer.as_ref().map(|p| p.name.as_str()).unwrap_or("unnamed")
    }
}

/// Poll a future exactly once; `None` when it is not ready.
pub(crate) fn poll_once<F: std::future::Future>(future: F) -> Option<F::Output> {
    futures::FutureExt::now_or_never(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadre_wire::{standard_registry, Request, RequestBody};

    async fn stream_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, (server, _)) =
            tokio::join!(async { TcpStream::connect(addr).await.unwrap() }, async {
                listener.accept().await.unwrap()
            });
        (client, server)
    }

    #[tokio::test]
    async fn reads_one_message_at_a_time() {
        let (client, server) = stream_pair().await;
        let mut conn = Connection::accepted(ConnectionId(1), server, standard_registry());

        let ping = Message::Request(Request::new(RequestBody::Ping)).encode();
        let status = Message::Request(Request::new(RequestBody::Status)).encode();
        let both = format!("{ping}{status}");
        client.writable().await.unwrap();
        assert_eq!(client.try_write(both.as_bytes()).unwrap(), both.len());

        // Wait until the bytes are visible on the server side.
        let Socket::Stream(s) = conn.socket() else { unreachable!() };
        s.readable().await.unwrap();

        let first = conn.read().unwrap();
        assert!(matches!(
            first,
            ReadOutcome::Message(Message::Request(Request { body: RequestBody::Ping, .. }))
        ));
        // The second message was buffered, not lost.
        assert!(conn.has_buffered_input());
        let second = conn.read().unwrap();
        assert!(matches!(
            second,
            ReadOutcome::Message(Message::Request(Request { body: RequestBody::Status, .. }))
        ));
    }

    #[tokio::test]
    async fn eof_disconnects_but_keeps_the_object() {
        let (client, server) = stream_pair().await;
        let mut conn = Connection::accepted(ConnectionId(1), server, standard_registry());
        drop(client);

        let Socket::Stream(s) = conn.socket() else { unreachable!() };
        s.readable().await.unwrap();

        assert!(matches!(conn.read().unwrap(), ReadOutcome::Disconnected));
        assert!(!conn.is_connected());
        assert_eq!(conn.id(), ConnectionId(1));
    }

    #[tokio::test]
    async fn garbage_input_is_a_wire_error() {
        let (client, server) = stream_pair().await;
        let mut conn = Connection::accepted(ConnectionId(1), server, standard_registry());
        client.writable().await.unwrap();
        client.try_write(b"<bogus>").unwrap();

        let Socket::Stream(s) = conn.socket() else { unreachable!() };
        s.readable().await.unwrap();

        assert!(matches!(conn.read(), Err(AgentError::Wire(_))));
    }

    #[tokio::test]
    async fn partial_send_retains_the_remainder() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let socket = tokio::net::TcpSocket::new_v4().unwrap();
        socket.set_send_buffer_size(8 * 1024).unwrap();
        let (client, (server, _)) =
            tokio::join!(async { socket.connect(addr).await.unwrap() }, async {
                listener.accept().await.unwrap()
            });
        let _server = server; // never read from; the client's writes must stall

        let mut conn = Connection::accepted(ConnectionId(1), client, standard_registry());
        let payload = vec![b'x'; 4 * 1024 * 1024];
        conn.send(&payload).await.unwrap();

        let retained = conn.outbound_len();
        assert!(retained > 0, "the whole payload fit in kernel buffers");
        assert!(retained < payload.len(), "nothing was written at all");
        assert!(conn.is_write_pending());
    }

    #[tokio::test]
    async fn send_without_peer_address_is_an_error() {
        let mut conn = Connection::to_peer(
            ConnectionId(1),
            AgentIdentity::new("addressless"),
            standard_registry(),
        );
        assert!(matches!(
            conn.send(b"hello").await,
            Err(AgentError::NoPeerAddress { .. })
        ));
    }

    #[tokio::test]
    async fn send_dials_the_peer_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::to_peer(
            ConnectionId(1),
            AgentIdentity::with_addr("director", "127.0.0.1", addr.port()),
            standard_registry(),
        );
        assert!(!conn.is_connected());
        conn.send(b"<none/>").await.unwrap();
        assert!(conn.is_connected());
        assert!(conn.is_self_initiated());

        let (mut server, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 7];
        tokio::io::AsyncReadExt::read_exact(&mut server, &mut buf).await.unwrap();
        assert_eq!(&buf, b"<none/>");
        assert!(!conn.is_write_pending());
    }

    #[tokio::test]
    async fn disconnect_resets_the_self_initiated_flag() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::to_peer(
            ConnectionId(1),
            AgentIdentity::with_addr("director", "127.0.0.1", addr.port()),
            standard_registry(),
        );
        conn.connect().await.unwrap();
        assert!(conn.is_self_initiated());

        conn.disconnect();
        assert!(!conn.is_connected());
        assert!(!conn.is_self_initiated());
    }
}
