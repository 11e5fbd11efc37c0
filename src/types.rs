use std::borrow::Cow;
use std::io;
use std::str;

use thiserror::Error;

use crate::constants::encoding_type;

/// Logical type of a value, as exposed to filters.
///
/// Packed on-disk representations collapse onto the type they encode:
/// a ziplist-encoded hash is still a `Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    String,
    List,
    Set,
    SortedSet,
    Hash,
}

impl Type {
    pub fn from_encoding(enc_type: u8) -> RdbResult<Type> {
        let typ = match enc_type {
            encoding_type::STRING => Type::String,
            encoding_type::HASH | encoding_type::HASH_ZIPMAP | encoding_type::HASH_ZIPLIST => {
                Type::Hash
            }
            encoding_type::LIST | encoding_type::LIST_ZIPLIST => Type::List,
            encoding_type::SET | encoding_type::SET_INTSET => Type::Set,
            encoding_type::ZSET | encoding_type::ZSET_ZIPLIST => Type::SortedSet,
            _ => return Err(RdbError::UnknownType(enc_type)),
        };

        Ok(typ)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Type::String => "string",
            Type::List => "list",
            Type::Set => "set",
            Type::SortedSet => "sortedset",
            Type::Hash => "hash",
        }
    }

    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "string" => Some(Type::String),
            "list" => Some(Type::List),
            "set" => Some(Type::Set),
            "sortedset" => Some(Type::SortedSet),
            "hash" => Some(Type::Hash),
            _ => None,
        }
    }
}

/// On-disk encoding of a record, passed to `start_*` callbacks as the `info`
/// argument. Packed encodings carry the byte size of their source blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodingType {
    String,
    LinkedList,
    Hashtable,
    Skiplist,
    Ziplist(u64),
    Intset(u64),
    Zipmap(u64),
}

impl EncodingType {
    pub fn name(&self) -> &'static str {
        match self {
            EncodingType::String => "string",
            EncodingType::LinkedList => "linkedlist",
            EncodingType::Hashtable => "hashtable",
            EncodingType::Skiplist => "skiplist",
            EncodingType::Ziplist(_) => "ziplist",
            EncodingType::Intset(_) => "intset",
            EncodingType::Zipmap(_) => "zipmap",
        }
    }

    /// Byte size of the source blob for packed encodings.
    pub fn sizeof_value(&self) -> Option<u64> {
        match self {
            EncodingType::Ziplist(size) | EncodingType::Intset(size) | EncodingType::Zipmap(size) => {
                Some(*size)
            }
            _ => None,
        }
    }
}

/// A decoded element.
///
/// The dump format stores some elements as byte strings and others as
/// integers (ziplist integer entries, intset members). Consumers that only
/// care about the textual form can go through [`Value::as_bytes`]; score
/// coercion goes through [`Value::as_f64`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Integer(i64),
    Double(f64),
}

impl Value {
    /// The element as raw bytes; numbers render as decimal ASCII.
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Bytes(bytes) => Cow::Borrowed(&bytes[..]),
            Value::Integer(n) => Cow::Owned(n.to_string().into_bytes()),
            Value::Double(d) => Cow::Owned(d.to_string().into_bytes()),
        }
    }

    /// Numeric coercion. Byte strings are parsed as ASCII floating point.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bytes(bytes) => str::from_utf8(bytes).ok()?.parse().ok(),
            Value::Integer(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Value {
        Value::Bytes(bytes)
    }
}

#[derive(Debug, Error)]
pub enum RdbError {
    #[error("I/O error: {0}")]
    Io(io::Error),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("missing or invalid magic string")]
    BadMagic,
    #[error("unsupported dump version {0}")]
    BadVersion(String),
    #[error("stream ended inside a length prefix")]
    MalformedLength,
    #[error("unknown string sub-encoding {0}")]
    MalformedString(u32),
    #[error("unknown value type {0}")]
    UnknownType(u8),
    #[error("invalid intset element width {0}")]
    BadIntsetEncoding(u32),
    #[error("invalid ziplist entry header {0:#04x}")]
    BadZiplistEntry(u8),
    #[error("invalid ziplist terminator {0:#04x}")]
    BadZiplistEnd(u8),
    #[error("expected even number of ziplist entries, found {0}")]
    BadZiplistPairCount(u16),
    #[error("zipmap ended in the middle of an entry")]
    TruncatedZipmap,
    #[error("LZF back-reference points before start of output")]
    BadLzfBackref,
    #[error("LZF output length {actual} does not match declared length {expected}")]
    LzfLengthMismatch { expected: usize, actual: usize },
    #[error("unparseable sorted set score {0:?}")]
    InvalidScore(String),
    #[error("expiry opcode not followed by a value record")]
    StrayExpiry,
    #[error("blob of {0} bytes exceeds the configured maximum")]
    BlobTooLarge(usize),
    #[error("{source} (key {key}, at byte {offset})")]
    WithContext {
        key: String,
        offset: u64,
        #[source]
        source: Box<RdbError>,
    },
}

impl RdbError {
    pub(crate) fn with_context(self, key: &[u8], offset: u64) -> RdbError {
        match self {
            err @ RdbError::WithContext { .. } => err,
            err => RdbError::WithContext {
                key: key_repr(key),
                offset,
                source: Box::new(err),
            },
        }
    }

    /// The underlying error, with any record context stripped.
    pub fn root(&self) -> &RdbError {
        match self {
            RdbError::WithContext { source, .. } => source.root(),
            err => err,
        }
    }
}

impl From<io::Error> for RdbError {
    fn from(err: io::Error) -> RdbError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            RdbError::UnexpectedEof
        } else {
            RdbError::Io(err)
        }
    }
}

fn key_repr(key: &[u8]) -> String {
    match str::from_utf8(key) {
        Ok(key) => key.to_owned(),
        Err(_) => format!("0x{}", hex::encode(key)),
    }
}

pub type RdbResult<T> = Result<T, RdbError>;

pub type RdbOk = RdbResult<()>;
