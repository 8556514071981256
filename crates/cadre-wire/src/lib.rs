//! Cadre wire protocol — the streaming object codec shared by all agents.
//!
//! Every value that crosses the network is a tree of tag-delimited elements
//! (`<str>`, `<int>`, `<list>`, `<dict>`, `<XMLObject class="..">`, ...),
//! and a connection's byte stream is an unbounded concatenation of such
//! trees with no framing between them. The codec here is built around that:
//! the decoder is a resumable push parser that accepts bytes in arbitrary
//! chunks and reports exactly where each top-level value ends.
//!
//! ## Architecture
//!
//! - **WireValue / WireObject**: the decoded value tree
//! - **StreamDecoder**: incremental decoder, single-object or drain-many mode
//! - **TypeRegistry**: maps `XMLObject` class names to message constructors
//! - **Message / Request / Response**: the application-level protocol

pub mod decode;
pub mod encode;
pub mod error;
pub mod message;
pub mod registry;
pub mod types;
pub mod value;

pub use decode::{FeedOutcome, StreamDecoder};
pub use encode::encode_value;
pub use error::WireError;
pub use message::{
    standard_registry, Message, Request, RequestBody, Response, ResponseBody, StatusReport,
};
pub use registry::TypeRegistry;
pub use types::{AgentIdentity, AgentState, CorrelationKey};
pub use value::{WireObject, WireValue};
