use super::write_str;
use crate::formatter::Formatter;
use crate::types::{EncodingType, RdbResult, Value};
use std::io;
use std::io::Write;

/// Replays the dump as serialization-protocol commands, suitable for piping
/// back into a server.
pub struct Protocol {
    out: Box<dyn Write + 'static>,
    last_expiry: Option<u64>,
}

impl Protocol {
    pub fn new() -> Protocol {
        let out = Box::new(io::stdout());
        Protocol {
            out,
            last_expiry: None,
        }
    }
}

impl Default for Protocol {
    fn default() -> Protocol {
        Protocol::new()
    }
}

impl Protocol {
    fn emit(&mut self, args: Vec<&[u8]>) -> RdbResult<()> {
        write_str(&mut self.out, "*")?;
        self.out.write_all(args.len().to_string().as_bytes())?;
        write_str(&mut self.out, "\r\n")?;
        for arg in &args {
            write_str(&mut self.out, "$")?;
            self.out.write_all(arg.len().to_string().as_bytes())?;
            write_str(&mut self.out, "\r\n")?;
            self.out.write_all(arg)?;
            write_str(&mut self.out, "\r\n")?;
        }

        Ok(())
    }

    fn pre_expire(&mut self, expiry: Option<u64>) {
        self.last_expiry = expiry
    }

    fn post_expire(&mut self, key: &[u8]) -> RdbResult<()> {
        if let Some(expire) = self.last_expiry {
            // Expiries arrive in microseconds; PEXPIREAT takes milliseconds.
            let expire = (expire / 1000).to_string();
            self.emit(vec!["PEXPIREAT".as_bytes(), key, expire.as_bytes()])?;
            self.last_expiry = None;
        }

        Ok(())
    }
}

impl Formatter for Protocol {
    fn start_database(&mut self, db_number: u32) -> RdbResult<()> {
        let db = db_number.to_string();
        self.emit(vec!["SELECT".as_bytes(), db.as_bytes()])?;

        Ok(())
    }

    fn set(
        &mut self,
        key: &[u8],
        value: &Value,
        expiry: Option<u64>,
        _info: EncodingType,
    ) -> RdbResult<()> {
        self.pre_expire(expiry);
        let value = value.as_bytes();
        self.emit(vec!["SET".as_bytes(), key, &value])?;
        self.post_expire(key)?;
        Ok(())
    }

    fn start_hash(
        &mut self,
        _key: &[u8],
        _length: u32,
        expiry: Option<u64>,
        _info: EncodingType,
    ) -> RdbResult<()> {
        self.pre_expire(expiry);

        Ok(())
    }

    fn hset(&mut self, key: &[u8], field: &Value, value: &Value) -> RdbResult<()> {
        let field = field.as_bytes();
        let value = value.as_bytes();
        self.emit(vec!["HSET".as_bytes(), key, &field, &value])?;
        Ok(())
    }

    fn end_hash(&mut self, key: &[u8]) -> RdbResult<()> {
        self.post_expire(key)?;

        Ok(())
    }

    fn start_set(
        &mut self,
        _key: &[u8],
        _cardinality: u32,
        expiry: Option<u64>,
        _info: EncodingType,
    ) -> RdbResult<()> {
        self.pre_expire(expiry);
        Ok(())
    }

    fn sadd(&mut self, key: &[u8], member: &Value) -> RdbResult<()> {
        let member = member.as_bytes();
        self.emit(vec!["SADD".as_bytes(), key, &member])?;
        Ok(())
    }

    fn end_set(&mut self, key: &[u8]) -> RdbResult<()> {
        self.post_expire(key)?;
        Ok(())
    }

    fn start_list(
        &mut self,
        _key: &[u8],
        _length: u32,
        expiry: Option<u64>,
        _info: EncodingType,
    ) -> RdbResult<()> {
        self.pre_expire(expiry);
        Ok(())
    }

    fn rpush(&mut self, key: &[u8], value: &Value) -> RdbResult<()> {
        let value = value.as_bytes();
        self.emit(vec!["RPUSH".as_bytes(), key, &value])?;
        Ok(())
    }

    fn end_list(&mut self, key: &[u8]) -> RdbResult<()> {
        self.post_expire(key)?;
        Ok(())
    }

    fn start_sorted_set(
        &mut self,
        _key: &[u8],
        _length: u32,
        expiry: Option<u64>,
        _info: EncodingType,
    ) -> RdbResult<()> {
        self.pre_expire(expiry);
        Ok(())
    }

    fn zadd(&mut self, key: &[u8], score: f64, member: &Value) -> RdbResult<()> {
        let score = score.to_string();
        let member = member.as_bytes();
        self.emit(vec!["ZADD".as_bytes(), key, score.as_bytes(), &member])?;
        Ok(())
    }

    fn end_sorted_set(&mut self, key: &[u8]) -> RdbResult<()> {
        self.post_expire(key)?;
        Ok(())
    }
}
