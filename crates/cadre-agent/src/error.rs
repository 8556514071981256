//! Runtime error types.

use thiserror::Error;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Protocol violation on a connection's byte stream.
    #[error(transparent)]
    Wire(#[from] cadre_wire::WireError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempt to dial a peer whose identity carries no address.
    #[error("connection to {peer} has no peer address")]
    NoPeerAddress { peer: String },

    #[error("failed to connect to {peer}: {source}")]
    Connect {
        peer: String,
        #[source]
        source: std::io::Error,
    },
}
