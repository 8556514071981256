//! Registry of wire classes the decoder will accept.

use std::collections::{HashMap, HashSet};

use crate::error::WireError;
use crate::message::Message;
use crate::value::WireObject;

/// Builds a [`Message`] from a decoded object, or explains why it can't.
pub type MessageFactory = fn(&WireObject) -> Result<Message, WireError>;

/// Maps `XMLObject` class names to constructors.
///
/// The decoder consults [`is_known`](TypeRegistry::is_known) as soon as an
/// object's opening tag appears; connections call
/// [`instantiate`](TypeRegistry::instantiate) once the object is complete.
/// Auxiliary classes are decodable but carry no message of their own, so
/// they only ever appear nested inside another object's fields.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, MessageFactory>,
    auxiliary: HashSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn register(&mut self, class: impl Into<String>, factory: MessageFactory) {
        self.factories.insert(class.into(), factory);
    }

    pub fn register_auxiliary(&mut self, class: impl Into<String>) {
        self.auxiliary.insert(class.into());
    }

    pub fn is_known(&self, class: &str) -> bool {
        self.factories.contains_key(class) || self.auxiliary.contains(class)
    }

    /// Turn a decoded object into a message.
    ///
    /// `Ok(None)` means the class is known but is not itself a message;
    /// callers discard such top-level objects.
    pub fn instantiate(&self, object: &WireObject) -> Result<Option<Message>, WireError> {
        if let Some(factory) = self.factories.get(&object.class) {
            factory(object).map(Some)
        } else if self.auxiliary.contains(&object.class) {
            Ok(None)
        } else {
            Err(WireError::UnknownType { class: object.class.clone() })
        }
    }
}
