//! rdbsax - streaming decoder for RDB dump files
//!
//! An RDB file is the binary snapshot of an in-memory key-value store,
//! sufficient to completely restore its state.
//!
//! This library reads such a dump sequentially and emits a semantic event
//! for everything it finds, in the spirit of a SAX parser for XML: nothing
//! is held in memory beyond the record currently being decoded, and the
//! consumer decides what to materialize.
//!
//! # Basic operation
//!
//! The whole surface is one method: `parse`. It takes care of reading the
//! dump from a stream, decoding the contained data and calling the provided
//! formatter with already-parsed values.
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("dump.rdb").unwrap();
//! let reader = BufReader::new(file);
//! rdbsax::parse(reader, rdbsax::formatter::Json::new(), rdbsax::filter::AllFilter).unwrap();
//! ```
//!
//! # Formatters
//!
//! Four formatters ship with the crate:
//!
//! * `Plain`: one line per element, for eyeballing a dump
//! * `Json`: the dump as a JSON document
//! * `Nil`: suppresses all output
//! * `Protocol`: replays the dump as serialization-protocol commands
//!
//! All of them implement the `Formatter` trait, which supplies a no-op
//! default for every event; custom consumers implement only the events they
//! care about.
//!
//! # Filters
//!
//! A `Filter` decides per record whether it is decoded or skipped. Skipped
//! records advance the stream byte-exactly without materializing values, so
//! carving a single key out of a multi-gigabyte dump stays cheap.
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use rdbsax::filter::StrictFilter;
//! use rdbsax::formatter::Plain;
//!
//! let mut filter = StrictFilter::new();
//! filter.add_database(0);
//! filter.add_keys(regex::Regex::new("^user:").unwrap());
//!
//! let reader = BufReader::new(File::open("dump.rdb").unwrap());
//! rdbsax::parse(reader, Plain::new(), filter).unwrap();
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub use crate::parser::RdbParser;
pub use crate::types::{EncodingType, RdbError, RdbOk, RdbResult, Type, Value};

pub mod constants;
pub mod filter;
pub mod formatter;
pub mod lzf;
pub mod parser;
pub mod types;

use crate::filter::Filter;
use crate::formatter::Formatter;

/// Parses a dump from `input`, emitting events to `formatter` for every
/// record accepted by `filter`.
pub fn parse<R: Read, F: Formatter, L: Filter>(input: R, formatter: F, filter: L) -> RdbOk {
    let mut parser = RdbParser::new(input, formatter, filter);
    parser.parse()
}

/// Convenience wrapper around [`parse`] for a dump file on disk.
pub fn parse_file<P: AsRef<Path>, F: Formatter, L: Filter>(
    path: P,
    formatter: F,
    filter: L,
) -> RdbOk {
    let file = File::open(path)?;
    parse(BufReader::new(file), formatter, filter)
}
