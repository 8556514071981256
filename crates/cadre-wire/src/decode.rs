//! Streaming decoder for the tag-delimited wire format.
//!
//! The decoder is a push parser: callers feed it whatever bytes the socket
//! produced, in chunks of any size, and it either completes a value or
//! remembers exactly where it was. Internally it is two layers with no
//! buffering between them: a byte-at-a-time tokenizer and a frame stack
//! that assembles [`WireValue`] trees from tokens.

use std::sync::Arc;

use crate::error::WireError;
use crate::registry::TypeRegistry;
use crate::value::{WireObject, WireValue};

/// Result of [`StreamDecoder::feed`].
#[derive(Debug)]
pub enum FeedOutcome {
    /// The input ended mid-value; feed more bytes to continue.
    NeedMoreInput,
    /// A top-level value closed after `consumed` bytes of this chunk.
    /// Bytes past `consumed` were not examined.
    Complete { value: WireValue, consumed: usize },
}

/// Incremental decoder bound to a type registry.
///
/// Class names on `XMLObject` elements are checked against the registry
/// the moment the opening tag completes, so an unknown type is rejected
/// without waiting for the rest of the document.
pub struct StreamDecoder {
    registry: Arc<TypeRegistry>,
    tokenizer: Tokenizer,
    stack: Vec<Frame>,
}

impl StreamDecoder {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        StreamDecoder {
            registry,
            tokenizer: Tokenizer::default(),
            stack: Vec::new(),
        }
    }

    /// Discard all partial state, as after a disconnect.
    pub fn reset(&mut self) {
        self.tokenizer = Tokenizer::default();
        self.stack.clear();
    }

    /// Single-object mode: stop at the first completed top-level value.
    ///
    /// On `Complete`, bytes at `buf[consumed..]` belong to the next value
    /// and must be offered again later; the decoder has not seen them.
    pub fn feed(&mut self, buf: &[u8]) -> Result<FeedOutcome, WireError> {
        let mut tokens = Vec::new();
        for (i, &byte) in buf.iter().enumerate() {
            tokens.clear();
            self.tokenizer.push_byte(byte, &mut tokens)?;
            for token in tokens.drain(..) {
                if let Some(value) = self.apply(token)? {
                    return Ok(FeedOutcome::Complete { value, consumed: i + 1 });
                }
            }
        }
        Ok(FeedOutcome::NeedMoreInput)
    }

    /// Drain-many mode: decode every value that completes within `buf`,
    /// keeping any trailing partial value as state for the next call.
    pub fn feed_all(&mut self, buf: &[u8], out: &mut Vec<WireValue>) -> Result<(), WireError> {
        let mut tokens = Vec::new();
        for &byte in buf {
            tokens.clear();
            self.tokenizer.push_byte(byte, &mut tokens)?;
            for token in tokens.drain(..) {
                if let Some(value) = self.apply(token)? {
                    out.push(value);
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, token: Token) -> Result<Option<WireValue>, WireError> {
        match token {
            Token::Text(text) => {
                match self.stack.last_mut() {
                    Some(Frame::Scalar { text: buf, .. }) => buf.push_str(&text),
                    // Whitespace between elements is tolerated anywhere.
                    _ => {
                        if !text.trim().is_empty() {
                            return Err(WireError::malformed(format!(
                                "unexpected text content {:?}",
                                text.trim()
                            )));
                        }
                    }
                }
                Ok(None)
            }
            Token::Open { name, class } => {
                self.open(name, class)?;
                Ok(None)
            }
            Token::Empty { name, class } => {
                self.open(name.clone(), class)?;
                self.close(&name)
            }
            Token::Close { name } => self.close(&name),
        }
    }

    fn open(&mut self, name: String, class: Option<String>) -> Result<(), WireError> {
        // Inside an object, any tag name opens a field.
        if matches!(self.stack.last(), Some(Frame::Object { .. })) {
            self.stack.push(Frame::Field { name, value: None });
            return Ok(());
        }
        let frame = match name.as_str() {
            "str" => Frame::scalar(ScalarKind::Str),
            "int" => Frame::scalar(ScalarKind::Int),
            "float" => Frame::scalar(ScalarKind::Float),
            "boolean" => Frame::scalar(ScalarKind::Bool),
            "none" => Frame::NoneTag,
            "list" => Frame::Seq { tuple: false, items: Vec::new() },
            "tuple" => Frame::Seq { tuple: true, items: Vec::new() },
            "dict" => Frame::Dict { pairs: Vec::new() },
            "pair" => Frame::Pair { key: None, value: None },
            "key" => Frame::Slot { is_key: true, value: None },
            "value" => Frame::Slot { is_key: false, value: None },
            "XMLObject" => {
                let class = class
                    .ok_or_else(|| WireError::malformed("XMLObject without class attribute"))?;
                if !self.registry.is_known(&class) {
                    return Err(WireError::UnknownType { class });
                }
                Frame::Object { object: WireObject::new(class) }
            }
            other => {
                return Err(WireError::malformed(format!("unexpected element <{other}>")));
            }
        };
        self.stack.push(frame);
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<Option<WireValue>, WireError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| WireError::malformed(format!("unmatched closing tag </{name}>")))?;
        if frame.tag_name() != name {
            return Err(WireError::malformed(format!(
                "closing tag </{name}> does not match open <{}>",
                frame.tag_name()
            )));
        }
        let closed = frame.finish()?;
        match self.stack.last_mut() {
            None => match closed {
                Closed::Value(value) => Ok(Some(value)),
                _ => Err(WireError::malformed(format!(
                    "<{name}> is not valid at the top level"
                ))),
            },
            Some(parent) => {
                parent.accept(closed)?;
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
}

impl ScalarKind {
    fn tag_name(self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "boolean",
        }
    }
}

/// One element currently open on the stack.
enum Frame {
    Scalar { kind: ScalarKind, text: String },
    NoneTag,
    Seq { tuple: bool, items: Vec<WireValue> },
    Dict { pairs: Vec<(WireValue, WireValue)> },
    Pair { key: Option<WireValue>, value: Option<WireValue> },
    Slot { is_key: bool, value: Option<WireValue> },
    Object { object: WireObject },
    Field { name: String, value: Option<WireValue> },
}

/// What a popped frame contributes to its parent.
enum Closed {
    Value(WireValue),
    PairEntry(WireValue, WireValue),
    KeySlot(WireValue),
    ValueSlot(WireValue),
    Field(String, WireValue),
}

impl Frame {
    fn scalar(kind: ScalarKind) -> Frame {
        Frame::Scalar { kind, text: String::new() }
    }

    fn tag_name(&self) -> &str {
        match self {
            Frame::Scalar { kind, .. } => kind.tag_name(),
            Frame::NoneTag => "none",
            Frame::Seq { tuple: false, .. } => "list",
            Frame::Seq { tuple: true, .. } => "tuple",
            Frame::Dict { .. } => "dict",
            Frame::Pair { .. } => "pair",
            Frame::Slot { is_key: true, .. } => "key",
            Frame::Slot { is_key: false, .. } => "value",
            Frame::Object { .. } => "XMLObject",
            Frame::Field { name, .. } => name,
        }
    }

    fn finish(self) -> Result<Closed, WireError> {
        match self {
            Frame::Scalar { kind, text } => Ok(Closed::Value(parse_scalar(kind, &text)?)),
            Frame::NoneTag => Ok(Closed::Value(WireValue::None)),
            Frame::Seq { tuple: false, items } => Ok(Closed::Value(WireValue::List(items))),
            Frame::Seq { tuple: true, items } => Ok(Closed::Value(WireValue::Tuple(items))),
            Frame::Dict { pairs } => Ok(Closed::Value(WireValue::Dict(pairs))),
            Frame::Pair { key: Some(key), value: Some(value) } => {
                Ok(Closed::PairEntry(key, value))
            }
            Frame::Pair { .. } => Err(WireError::malformed("<pair> missing its key or value")),
            Frame::Slot { value: Some(value), is_key } => Ok(if is_key {
                Closed::KeySlot(value)
            } else {
                Closed::ValueSlot(value)
            }),
            Frame::Slot { is_key, .. } => Err(WireError::malformed(format!(
                "empty <{}> element",
                if is_key { "key" } else { "value" }
            ))),
            Frame::Object { object } => Ok(Closed::Value(WireValue::Object(object))),
            Frame::Field { name, value: Some(value) } => Ok(Closed::Field(name, value)),
            Frame::Field { name, .. } => {
                Err(WireError::malformed(format!("field <{name}> holds no value")))
            }
        }
    }

    fn accept(&mut self, closed: Closed) -> Result<(), WireError> {
        match (self, closed) {
            (Frame::Seq { items, .. }, Closed::Value(value)) => {
                items.push(value);
                Ok(())
            }
            (Frame::Dict { pairs }, Closed::PairEntry(key, value)) => {
                pairs.push((key, value));
                Ok(())
            }
            (Frame::Dict { .. }, _) => {
                Err(WireError::malformed("<dict> may only contain <pair> elements"))
            }
            (Frame::Pair { key, .. }, Closed::KeySlot(value)) => {
                if key.is_some() {
                    return Err(WireError::malformed("<pair> with more than one <key>"));
                }
                *key = Some(value);
                Ok(())
            }
            (Frame::Pair { value, .. }, Closed::ValueSlot(v)) => {
                if value.is_some() {
                    return Err(WireError::malformed("<pair> with more than one <value>"));
                }
                *value = Some(v);
                Ok(())
            }
            (Frame::Pair { .. }, _) => Err(WireError::malformed(
                "<pair> may only contain <key> and <value> elements",
            )),
            (Frame::Slot { value, is_key }, Closed::Value(v)) => {
                if value.is_some() {
                    return Err(WireError::malformed(format!(
                        "<{}> holds more than one value",
                        if *is_key { "key" } else { "value" }
                    )));
                }
                *value = Some(v);
                Ok(())
            }
            (Frame::Object { object }, Closed::Field(name, value)) => {
                object.fields.push((name, value));
                Ok(())
            }
            (Frame::Field { value, name }, Closed::Value(v)) => {
                if value.is_some() {
                    return Err(WireError::malformed(format!(
                        "field <{name}> holds more than one value"
                    )));
                }
                *value = Some(v);
                Ok(())
            }
            (frame, _) => Err(WireError::malformed(format!(
                "element not valid inside <{}>",
                frame.tag_name()
            ))),
        }
    }
}

fn parse_scalar(kind: ScalarKind, text: &str) -> Result<WireValue, WireError> {
    match kind {
        ScalarKind::Str => Ok(WireValue::Str(text.to_owned())),
        ScalarKind::Int => text
            .trim()
            .parse::<i64>()
            .map(WireValue::Int)
            .map_err(|_| WireError::malformed(format!("invalid integer literal {:?}", text.trim()))),
        ScalarKind::Float => text
            .trim()
            .parse::<f64>()
            .map(WireValue::Float)
            .map_err(|_| WireError::malformed(format!("invalid float literal {:?}", text.trim()))),
        ScalarKind::Bool => match text.trim() {
            "True" => Ok(WireValue::Bool(true)),
            "False" => Ok(WireValue::Bool(false)),
            other => Err(WireError::malformed(format!(
                "invalid boolean literal {:?}, expected True or False",
                other
            ))),
        },
    }
}

/// Tokens the tokenizer hands to the frame stack.
#[derive(Debug)]
enum Token {
    Open { name: String, class: Option<String> },
    Close { name: String },
    Empty { name: String, class: Option<String> },
    Text(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum TokState {
    #[default]
    Text,
    Entity,
    TagStart,
    Name,
    InTag,
    AttrName,
    AttrEq,
    AttrValue,
    SelfClose,
}

/// Byte-at-a-time lexer. Buffers are raw bytes so a multi-byte character
/// split across feeds reassembles correctly; UTF-8 validity is checked
/// when a buffer becomes a token.
#[derive(Default)]
struct Tokenizer {
    state: TokState,
    text: Vec<u8>,
    name: Vec<u8>,
    entity: Vec<u8>,
    attr_name: Vec<u8>,
    attr_value: Vec<u8>,
    class: Option<String>,
    closing: bool,
}

const MAX_ENTITY_LEN: usize = 8;

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

impl Tokenizer {
    fn push_byte(&mut self, byte: u8, out: &mut Vec<Token>) -> Result<(), WireError> {
        match self.state {
            TokState::Text => match byte {
                b'<' => {
                    self.flush_text(out)?;
                    self.state = TokState::TagStart;
                }
                b'&' => {
                    self.entity.clear();
                    self.state = TokState::Entity;
                }
                b'>' => return Err(WireError::malformed("unescaped '>' in text content")),
                _ => self.text.push(byte),
            },
            TokState::Entity => match byte {
                b';' => {
                    let replacement = match self.entity.as_slice() {
                        b"amp" => b'&',
                        b"lt" => b'<',
                        b"gt" => b'>',
                        b"quot" => b'"',
                        b"apos" => b'\'',
                        other => {
                            return Err(WireError::malformed(format!(
                                "unknown entity &{};",
                                String::from_utf8_lossy(other)
                            )))
                        }
                    };
                    self.text.push(replacement);
                    self.state = TokState::Text;
                }
                _ => {
                    if self.entity.len() >= MAX_ENTITY_LEN {
                        return Err(WireError::malformed("unterminated entity reference"));
                    }
                    self.entity.push(byte);
                }
            },
            TokState::TagStart => match byte {
                b'/' => {
                    self.closing = true;
                    self.name.clear();
                    self.state = TokState::Name;
                }
                b if is_name_byte(b) => {
                    self.closing = false;
                    self.name.clear();
                    self.name.push(b);
                    self.state = TokState::Name;
                }
                _ => return Err(WireError::malformed("invalid character after '<'")),
            },
            TokState::Name => match byte {
                b if is_name_byte(b) => self.name.push(b),
                b'>' => self.emit_tag(out)?,
                b'/' if !self.closing => self.state = TokState::SelfClose,
                b' ' | b'\t' | b'\r' | b'\n' => self.state = TokState::InTag,
                _ => return Err(WireError::malformed("invalid character in tag name")),
            },
            TokState::InTag => match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {}
                b'>' => self.emit_tag(out)?,
                b'/' if !self.closing => self.state = TokState::SelfClose,
                b if is_name_byte(b) => {
                    if self.closing {
                        return Err(WireError::malformed("attribute in closing tag"));
                    }
                    self.attr_name.clear();
                    self.attr_name.push(b);
                    self.state = TokState::AttrName;
                }
                _ => return Err(WireError::malformed("invalid character in tag")),
            },
            TokState::AttrName => match byte {
                b if is_name_byte(b) => self.attr_name.push(b),
                b'=' => self.state = TokState::AttrEq,
                _ => return Err(WireError::malformed("malformed attribute")),
            },
            TokState::AttrEq => match byte {
                b'"' => {
                    self.attr_value.clear();
                    self.state = TokState::AttrValue;
                }
                _ => return Err(WireError::malformed("attribute value must be quoted")),
            },
            TokState::AttrValue => match byte {
                b'"' => {
                    if self.attr_name == b"class" {
                        let value = take_utf8(&mut self.attr_value)?;
                        self.class = Some(value);
                    } else {
                        self.attr_value.clear();
                    }
                    self.state = TokState::InTag;
                }
                _ => self.attr_value.push(byte),
            },
            TokState::SelfClose => match byte {
                b'>' => {
                    let name = take_utf8(&mut self.name)?;
                    let class = self.class.take();
                    out.push(Token::Empty { name, class });
                    self.state = TokState::Text;
                }
                _ => return Err(WireError::malformed("invalid character after '/'")),
            },
        }
        Ok(())
    }

    fn emit_tag(&mut self, out: &mut Vec<Token>) -> Result<(), WireError> {
        let name = take_utf8(&mut self.name)?;
        let class = self.class.take();
        if self.closing {
            if class.is_some() {
                return Err(WireError::malformed("attribute in closing tag"));
            }
            self.closing = false;
            out.push(Token::Close { name });
        } else {
            out.push(Token::Open { name, class });
        }
        self.state = TokState::Text;
        Ok(())
    }

    fn flush_text(&mut self, out: &mut Vec<Token>) -> Result<(), WireError> {
        if !self.text.is_empty() {
            out.push(Token::Text(take_utf8(&mut self.text)?));
        }
        Ok(())
    }
}

fn take_utf8(buf: &mut Vec<u8>) -> Result<String, WireError> {
    String::from_utf8(std::mem::take(buf))
        .map_err(|_| WireError::malformed("invalid UTF-8 in wire data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_value;

    fn registry() -> Arc<TypeRegistry> {
        let mut registry = TypeRegistry::default();
        registry.register_auxiliary("test.Widget");
        Arc::new(registry)
    }

    fn decode_one(input: &str) -> WireValue {
        let mut decoder = StreamDecoder::new(registry());
        match decoder.feed(input.as_bytes()) {
            Ok(FeedOutcome::Complete { value, consumed }) => {
                assert_eq!(consumed, input.len());
                value
            }
            other => panic!("expected complete value, got {other:?}"),
        }
    }

    fn decode_err(input: &str) -> WireError {
        let mut decoder = StreamDecoder::new(registry());
        match decoder.feed(input.as_bytes()) {
            Err(err) => err,
            Ok(outcome) => panic!("expected error, got {outcome:?}"),
        }
    }

    #[test]
    fn scalar_round_trips() {
        let values = [
            WireValue::Str("hello".into()),
            WireValue::Str(String::new()),
            WireValue::Int(0),
            WireValue::Int(i64::MIN),
            WireValue::Float(-2.5),
            WireValue::Bool(true),
            WireValue::None,
        ];
        for value in values {
            assert_eq!(decode_one(&encode_value(&value)), value);
        }
    }

    #[test]
    fn composite_round_trip() {
        let value = WireValue::Dict(vec![
            (
                WireValue::Str("items".into()),
                WireValue::List(vec![
                    WireValue::Tuple(vec![WireValue::Int(1), WireValue::None]),
                    WireValue::Str("a&b".into()),
                ]),
            ),
            (WireValue::Int(9), WireValue::Bool(false)),
        ]);
        assert_eq!(decode_one(&encode_value(&value)), value);
    }

    #[test]
    fn object_round_trip() {
        let obj = WireObject::new("test.Widget")
            .field("name", WireValue::Str("x<y".into()))
            .field("weight", WireValue::Float(1.25))
            .field("tags", WireValue::List(vec![WireValue::Str("a".into())]));
        let value = WireValue::Object(obj);
        assert_eq!(decode_one(&encode_value(&value)), value);
    }

    #[test]
    fn byte_at_a_time_feed_matches_whole_buffer() {
        let value = WireValue::Dict(vec![
            (
                WireValue::Str("k<&>".into()),
                WireValue::Tuple(vec![WireValue::Int(-3), WireValue::None]),
            ),
            (
                WireValue::Str("widget".into()),
                WireValue::Object(
                    WireObject::new("test.Widget")
                        .field("label", WireValue::Str("a&b".into()))
                        .field("count", WireValue::Int(2)),
                ),
            ),
        ]);
        let encoded = encode_value(&value);
        let mut decoder = StreamDecoder::new(registry());
        let bytes = encoded.as_bytes();
        for (i, chunk) in bytes.chunks(1).enumerate() {
            match decoder.feed(chunk).unwrap() {
                FeedOutcome::NeedMoreInput => assert!(i + 1 < bytes.len()),
                FeedOutcome::Complete { value: decoded, consumed } => {
                    assert_eq!(i + 1, bytes.len());
                    assert_eq!(consumed, 1);
                    assert_eq!(decoded, value);
                }
            }
        }
    }

    #[test]
    fn single_object_mode_stops_at_boundary() {
        let first = encode_value(&WireValue::Int(1));
        let second = encode_value(&WireValue::Str("next".into()));
        let joined = format!("{first}{second}");
        let mut decoder = StreamDecoder::new(registry());
        match decoder.feed(joined.as_bytes()).unwrap() {
            FeedOutcome::Complete { value, consumed } => {
                assert_eq!(value, WireValue::Int(1));
                assert_eq!(consumed, first.len());
                // Leftover bytes decode as the next value.
                match decoder.feed(&joined.as_bytes()[consumed..]).unwrap() {
                    FeedOutcome::Complete { value, .. } => {
                        assert_eq!(value, WireValue::Str("next".into()));
                    }
                    other => panic!("expected second value, got {other:?}"),
                }
            }
            other => panic!("expected first value, got {other:?}"),
        }
    }

    #[test]
    fn feed_all_drains_several_values() {
        let mut stream = String::new();
        let values = [
            WireValue::Int(1),
            WireValue::None,
            WireValue::List(vec![WireValue::Bool(true)]),
        ];
        for v in &values {
            stream.push_str(&encode_value(v));
        }
        // Leave a partial value dangling at the end.
        stream.push_str("<str>unfini");
        let mut decoder = StreamDecoder::new(registry());
        let mut out = Vec::new();
        decoder.feed_all(stream.as_bytes(), &mut out).unwrap();
        assert_eq!(out, values);
        // The dangling value completes on a later call.
        decoder.feed_all(b"shed</str>", &mut out).unwrap();
        assert_eq!(out.last(), Some(&WireValue::Str("unfinished".into())));
    }

    #[test]
    fn explicit_none_close_tag_accepted() {
        assert_eq!(decode_one("<none></none>"), WireValue::None);
    }

    #[test]
    fn whitespace_between_elements_tolerated() {
        let input = "<list>\n  <int> 4 </int>\n  <none/>\n</list>";
        assert_eq!(
            decode_one(input),
            WireValue::List(vec![WireValue::Int(4), WireValue::None])
        );
    }

    #[test]
    fn mismatched_close_rejected() {
        assert!(matches!(
            decode_err("<list></dict>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn bad_literals_rejected() {
        assert!(matches!(decode_err("<int>12x</int>"), WireError::Malformed(_)));
        assert!(matches!(
            decode_err("<boolean>true</boolean>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn text_outside_scalars_rejected() {
        assert!(matches!(
            decode_err("<list>stray<int>1</int></list>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn unknown_element_rejected() {
        assert!(matches!(decode_err("<widget>1</widget>"), WireError::Malformed(_)));
    }

    #[test]
    fn unknown_class_rejected_at_open_tag() {
        let err = decode_err("<XMLObject class=\"test.Missing\"><f><int>1</int></f></XMLObject>");
        match err {
            WireError::UnknownType { class } => assert_eq!(class, "test.Missing"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn object_without_class_rejected() {
        assert!(matches!(
            decode_err("<XMLObject><f><int>1</int></f></XMLObject>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn pair_outside_dict_rejected() {
        assert!(matches!(
            decode_err("<pair><key><int>1</int></key><value><int>2</int></value></pair>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn dict_rejects_bare_values() {
        assert!(matches!(
            decode_err("<dict><int>1</int></dict>"),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn entity_split_across_feeds() {
        let mut decoder = StreamDecoder::new(registry());
        assert!(matches!(
            decoder.feed(b"<str>a&am").unwrap(),
            FeedOutcome::NeedMoreInput
        ));
        match decoder.feed(b"p;b</str>").unwrap() {
            FeedOutcome::Complete { value, .. } => {
                assert_eq!(value, WireValue::Str("a&b".into()));
            }
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut decoder = StreamDecoder::new(registry());
        decoder.feed(b"<list><int>4").unwrap();
        decoder.reset();
        assert_eq!(
            match decoder.feed(b"<int>7</int>").unwrap() {
                FeedOutcome::Complete { value, .. } => value,
                other => panic!("expected value, got {other:?}"),
            },
            WireValue::Int(7)
        );
    }
}
