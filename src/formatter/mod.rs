use std::io::Write;

pub use self::json::Json;
pub use self::nil::Nil;
pub use self::plain::Plain;
pub use self::protocol::Protocol;

use crate::types::{EncodingType, RdbResult, Value};

pub mod json;
pub mod nil;
pub mod plain;
pub mod protocol;

pub fn write_str<W: Write>(out: &mut W, data: &str) -> RdbResult<()> {
    out.write_all(data.as_bytes())?;

    Ok(())
}

/// Receives parse events in file order.
///
/// Every method defaults to a no-op, so consumers implement only what they
/// need. `expiry` is microseconds since the Unix epoch; `info` describes the
/// on-disk encoding of the record. For each record the `start_*` call
/// precedes its per-element calls, which precede the matching `end_*`.
#[allow(unused_variables)]
pub trait Formatter {
    fn start_rdb(&mut self) -> RdbResult<()> {
        Ok(())
    }
    fn end_rdb(&mut self) -> RdbResult<()> {
        Ok(())
    }

    fn start_database(&mut self, db_index: u32) -> RdbResult<()> {
        Ok(())
    }
    fn end_database(&mut self, db_index: u32) -> RdbResult<()> {
        Ok(())
    }

    fn set(
        &mut self,
        key: &[u8],
        value: &Value,
        expiry: Option<u64>,
        info: EncodingType,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn start_hash(
        &mut self,
        key: &[u8],
        length: u32,
        expiry: Option<u64>,
        info: EncodingType,
    ) -> RdbResult<()> {
        Ok(())
    }
    fn hset(&mut self, key: &[u8], field: &Value, value: &Value) -> RdbResult<()> {
        Ok(())
    }
    fn end_hash(&mut self, key: &[u8]) -> RdbResult<()> {
        Ok(())
    }

    fn start_set(
        &mut self,
        key: &[u8],
        cardinality: u32,
        expiry: Option<u64>,
        info: EncodingType,
    ) -> RdbResult<()> {
        Ok(())
    }
    fn sadd(&mut self, key: &[u8], member: &Value) -> RdbResult<()> {
        Ok(())
    }
    fn end_set(&mut self, key: &[u8]) -> RdbResult<()> {
        Ok(())
    }

    fn start_list(
        &mut self,
        key: &[u8],
        length: u32,
        expiry: Option<u64>,
        info: EncodingType,
    ) -> RdbResult<()> {
        Ok(())
    }
    fn rpush(&mut self, key: &[u8], value: &Value) -> RdbResult<()> {
        Ok(())
    }
    fn end_list(&mut self, key: &[u8]) -> RdbResult<()> {
        Ok(())
    }

    fn start_sorted_set(
        &mut self,
        key: &[u8],
        length: u32,
        expiry: Option<u64>,
        info: EncodingType,
    ) -> RdbResult<()> {
        Ok(())
    }
    fn zadd(&mut self, key: &[u8], score: f64, member: &Value) -> RdbResult<()> {
        Ok(())
    }
    fn end_sorted_set(&mut self, key: &[u8]) -> RdbResult<()> {
        Ok(())
    }
}
