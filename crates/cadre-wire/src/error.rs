//! Codec and registry error types.

use thiserror::Error;

/// Errors surfaced by the codec and the type registry.
///
/// A decode error is fatal to the stream it occurred on: once the parser
/// has rejected input there is no way to resynchronise with the peer, so
/// callers are expected to tear the connection down.
#[derive(Debug, Error)]
pub enum WireError {
    /// Input that violates the wire grammar.
    #[error("malformed wire data: {0}")]
    Malformed(String),

    /// An `XMLObject` naming a class no registry entry exists for.
    #[error("unknown wire type `{class}`")]
    UnknownType { class: String },

    /// A known class whose fields could not be turned into a message.
    #[error("cannot instantiate `{class}`: {reason}")]
    Instantiation { class: String, reason: String },
}

impl WireError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        WireError::Malformed(msg.into())
    }
}
