use std::io::{self, Cursor, Read};
use std::str;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::debug;

use crate::constants::{constant, encoding, encoding_type, op_code, version};
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::lzf;
use crate::types::{EncodingType, RdbError, RdbOk, RdbResult, Type, Value};

/// The streaming parser.
///
/// Drives the opcode loop over `input`, decoding every record the filter
/// accepts and emitting its elements to `formatter` in file order. Rejected
/// records are skipped byte-exactly without materializing values.
pub struct RdbParser<R: Read, F: Formatter, L: Filter> {
    input: ByteCounter<R>,
    formatter: F,
    filter: L,
    last_expiretime: Option<u64>,
    max_blob_size: Option<usize>,
}

/// Tracks the absolute stream position so errors can report a byte offset.
struct ByteCounter<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for ByteCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

fn read_exact<R: Read>(input: &mut R, len: usize) -> RdbResult<Vec<u8>> {
    let mut buf = vec![0; len];
    input.read_exact(&mut buf)?;

    Ok(buf)
}

fn int_to_vec(number: i32) -> Vec<u8> {
    number.to_string().into_bytes()
}

fn eof_to_malformed_length(err: io::Error) -> RdbError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        RdbError::MalformedLength
    } else {
        RdbError::Io(err)
    }
}

/// Reads the variable-width length prefix.
///
/// Returns `(length, encoded)`; with `encoded` set, the length slot holds a
/// sub-encoding selector instead of a byte count.
pub fn read_length_with_encoding<R: Read>(input: &mut R) -> RdbResult<(u32, bool)> {
    let enc_type = input.read_u8().map_err(eof_to_malformed_length)?;

    match (enc_type & 0xC0) >> 6 {
        constant::RDB_ENCVAL => Ok(((enc_type & 0x3F) as u32, true)),
        constant::RDB_6BITLEN => Ok(((enc_type & 0x3F) as u32, false)),
        constant::RDB_14BITLEN => {
            let next_byte = input.read_u8().map_err(eof_to_malformed_length)?;
            Ok(((((enc_type & 0x3F) as u32) << 8) | next_byte as u32, false))
        }
        _ => {
            // The 32-bit length is the one big-endian field in the stream.
            let length = input
                .read_u32::<BigEndian>()
                .map_err(eof_to_malformed_length)?;
            Ok((length, false))
        }
    }
}

pub fn read_length<R: Read>(input: &mut R) -> RdbResult<u32> {
    let (length, _) = read_length_with_encoding(input)?;
    Ok(length)
}

pub fn verify_magic<R: Read>(input: &mut R) -> RdbOk {
    let mut magic = [0; 5];
    input
        .read_exact(&mut magic)
        .map_err(|_| RdbError::BadMagic)?;

    if magic == constant::RDB_MAGIC.as_bytes() {
        Ok(())
    } else {
        Err(RdbError::BadMagic)
    }
}

/// Reads the 4-digit ASCII version and returns it if supported.
pub fn verify_version<R: Read>(input: &mut R) -> RdbResult<u32> {
    let mut raw = [0; 4];
    input
        .read_exact(&mut raw)
        .map_err(|_| RdbError::BadVersion(String::from("????")))?;

    let version: u32 = str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RdbError::BadVersion(String::from_utf8_lossy(&raw).into_owned()))?;

    if (version::SUPPORTED_MINIMUM..=version::SUPPORTED_MAXIMUM).contains(&version) {
        Ok(version)
    } else {
        Err(RdbError::BadVersion(version.to_string()))
    }
}

/// Reads one string payload: raw bytes, a small integer rendered as decimal
/// ASCII, or an LZF-compressed blob.
pub fn read_blob<R: Read>(input: &mut R) -> RdbResult<Vec<u8>> {
    read_blob_with_limit(input, None)
}

fn check_blob_size(size: usize, limit: Option<usize>) -> RdbOk {
    match limit {
        Some(limit) if size > limit => Err(RdbError::BlobTooLarge(size)),
        _ => Ok(()),
    }
}

fn read_blob_with_limit<R: Read>(input: &mut R, limit: Option<usize>) -> RdbResult<Vec<u8>> {
    let (length, is_encoded) = read_length_with_encoding(input)?;

    if is_encoded {
        match length {
            encoding::INT8 => Ok(int_to_vec(input.read_i8()? as i32)),
            encoding::INT16 => Ok(int_to_vec(input.read_i16::<LittleEndian>()? as i32)),
            encoding::INT32 => Ok(int_to_vec(input.read_i32::<LittleEndian>()?)),
            encoding::LZF => {
                let compressed_length = read_length(input)? as usize;
                let real_length = read_length(input)? as usize;
                check_blob_size(compressed_length, limit)?;
                check_blob_size(real_length, limit)?;
                let data = read_exact(input, compressed_length)?;
                lzf::decompress(&data, real_length)
            }
            _ => Err(RdbError::MalformedString(length)),
        }
    } else {
        check_blob_size(length as usize, limit)?;
        read_exact(input, length as usize)
    }
}

fn read_ziplist_metadata<T: Read>(input: &mut T) -> RdbResult<(u32, u32, u16)> {
    let zlbytes = input.read_u32::<LittleEndian>()?;
    let zltail = input.read_u32::<LittleEndian>()?;
    let zllen = input.read_u16::<LittleEndian>()?;

    Ok((zlbytes, zltail, zllen))
}

/// One length slot inside a zipmap. `None` is the 0xFF terminator.
fn read_zipmap_length<T: Read>(input: &mut T) -> RdbResult<Option<u32>> {
    let next_byte = input.read_u8()?;
    match next_byte {
        255 => Ok(None),
        254 => Ok(Some(input.read_u32::<LittleEndian>()?)),
        _ => Ok(Some(next_byte as u32)),
    }
}

/// Zipmap values that look like integers are surfaced as integers.
fn zipmap_value(raw: Vec<u8>) -> Value {
    match str::from_utf8(&raw).ok().and_then(|s| s.parse::<i64>().ok()) {
        Some(number) => Value::Integer(number),
        None => Value::Bytes(raw),
    }
}

fn score_from_value(value: &Value) -> RdbResult<f64> {
    value.as_f64().ok_or_else(|| {
        RdbError::InvalidScore(String::from_utf8_lossy(&value.as_bytes()).into_owned())
    })
}

impl<R: Read, F: Formatter, L: Filter> RdbParser<R, F, L> {
    pub fn new(input: R, formatter: F, filter: L) -> RdbParser<R, F, L> {
        RdbParser {
            input: ByteCounter { inner: input, position: 0 },
            formatter,
            filter,
            last_expiretime: None,
            max_blob_size: None,
        }
    }

    /// Refuse to materialize any single blob larger than `bytes`.
    pub fn with_max_blob_size(mut self, bytes: usize) -> RdbParser<R, F, L> {
        self.max_blob_size = Some(bytes);
        self
    }

    pub fn parse(&mut self) -> RdbOk {
        verify_magic(&mut self.input)?;
        let version = verify_version(&mut self.input)?;
        debug!("parsing dump version {}", version);

        self.formatter.start_rdb()?;

        let mut current_db: u32 = 0;
        let mut first_db = true;

        loop {
            let mut next_op = self.input.read_u8()?;

            if next_op == op_code::EXPIRETIME_MS {
                let expiretime_ms = self.input.read_u64::<LittleEndian>()?;
                self.last_expiretime = Some(expiretime_ms.saturating_mul(1000));
                next_op = self.input.read_u8()?;
            } else if next_op == op_code::EXPIRETIME {
                let expiretime = self.input.read_u32::<LittleEndian>()?;
                self.last_expiretime = Some(expiretime as u64 * 1_000_000);
                next_op = self.input.read_u8()?;
            }

            match next_op {
                op_code::SELECTDB => {
                    // An expiry must be followed by the type byte of its record.
                    if self.last_expiretime.is_some() {
                        return Err(RdbError::StrayExpiry);
                    }
                    if !first_db {
                        self.formatter.end_database(current_db)?;
                    }
                    first_db = false;
                    current_db = read_length(&mut self.input)?;
                    debug!("selecting database {}", current_db);
                    self.formatter.start_database(current_db)?;
                }
                op_code::EOF => {
                    if self.last_expiretime.is_some() {
                        return Err(RdbError::StrayExpiry);
                    }
                    self.formatter.end_database(current_db)?;
                    self.formatter.end_rdb()?;
                    debug!("end of dump after {} bytes", self.input.position);
                    // Trailing checksum bytes, if present, stay unread.
                    break;
                }
                _ => {
                    let typ = Type::from_encoding(next_op)?;

                    if self.filter.matches_db(current_db) {
                        let key = self.read_blob()?;

                        let result = if self.filter.matches_type(typ) && self.filter.matches_key(&key)
                        {
                            self.read_type(&key, next_op)
                        } else {
                            self.skip_object(next_op)
                        };
                        result.map_err(|err| err.with_context(&key, self.input.position))?;
                    } else {
                        self.skip_key_and_object(next_op)?;
                    }

                    self.last_expiretime = None;
                }
            }
        }

        Ok(())
    }

    fn read_blob(&mut self) -> RdbResult<Vec<u8>> {
        read_blob_with_limit(&mut self.input, self.max_blob_size)
    }

    fn read_type(&mut self, key: &[u8], value_type: u8) -> RdbOk {
        match value_type {
            encoding_type::STRING => {
                let val = self.read_blob()?;
                self.formatter.set(
                    key,
                    &Value::Bytes(val),
                    self.last_expiretime,
                    EncodingType::String,
                )
            }
            encoding_type::LIST => self.read_linked_list(key, Type::List),
            encoding_type::SET => self.read_linked_list(key, Type::Set),
            encoding_type::ZSET => self.read_sorted_set(key),
            encoding_type::HASH => self.read_hash(key),
            encoding_type::HASH_ZIPMAP => self.read_hash_zipmap(key),
            encoding_type::LIST_ZIPLIST => self.read_list_ziplist(key),
            encoding_type::SET_INTSET => self.read_set_intset(key),
            encoding_type::ZSET_ZIPLIST => self.read_sortedset_ziplist(key),
            encoding_type::HASH_ZIPLIST => self.read_hash_ziplist(key),
            _ => Err(RdbError::UnknownType(value_type)),
        }
    }

    fn read_linked_list(&mut self, key: &[u8], typ: Type) -> RdbOk {
        let mut len = read_length(&mut self.input)?;

        match typ {
            Type::List => {
                self.formatter
                    .start_list(key, len, self.last_expiretime, EncodingType::LinkedList)?;
            }
            _ => {
                self.formatter
                    .start_set(key, len, self.last_expiretime, EncodingType::Hashtable)?;
            }
        }

        while len > 0 {
            let blob = self.read_blob()?;
            let element = Value::Bytes(blob);
            match typ {
                Type::List => self.formatter.rpush(key, &element)?,
                _ => self.formatter.sadd(key, &element)?,
            }
            len -= 1;
        }

        match typ {
            Type::List => self.formatter.end_list(key),
            _ => self.formatter.end_set(key),
        }
    }

    fn read_sorted_set(&mut self, key: &[u8]) -> RdbOk {
        let mut set_items = read_length(&mut self.input)?;

        self.formatter.start_sorted_set(
            key,
            set_items,
            self.last_expiretime,
            EncodingType::Skiplist,
        )?;

        while set_items > 0 {
            let member = self.read_blob()?;
            let score_length = self.input.read_u8()?;
            let score = match score_length {
                253 => f64::NAN,
                254 => f64::INFINITY,
                255 => f64::NEG_INFINITY,
                _ => {
                    let raw = read_exact(&mut self.input, score_length as usize)?;
                    score_from_value(&Value::Bytes(raw))?
                }
            };

            self.formatter.zadd(key, score, &Value::Bytes(member))?;

            set_items -= 1;
        }

        self.formatter.end_sorted_set(key)
    }

    fn read_hash(&mut self, key: &[u8]) -> RdbOk {
        let mut hash_items = read_length(&mut self.input)?;

        self.formatter.start_hash(
            key,
            hash_items,
            self.last_expiretime,
            EncodingType::Hashtable,
        )?;

        while hash_items > 0 {
            let field = self.read_blob()?;
            let val = self.read_blob()?;

            self.formatter
                .hset(key, &Value::Bytes(field), &Value::Bytes(val))?;

            hash_items -= 1;
        }

        self.formatter.end_hash(key)
    }

    fn read_hash_zipmap(&mut self, key: &[u8]) -> RdbOk {
        let zipmap = self.read_blob()?;
        let raw_length = zipmap.len() as u64;

        let mut reader = Cursor::new(zipmap);

        // Declared entry count; not authoritative, the terminator is.
        let zmlen = reader.read_u8()?;

        self.formatter.start_hash(
            key,
            zmlen as u32,
            self.last_expiretime,
            EncodingType::Zipmap(raw_length),
        )?;

        loop {
            let field_length = match read_zipmap_length(&mut reader)? {
                Some(length) => length,
                None => break,
            };
            let field = read_exact(&mut reader, field_length as usize)?;

            let value_length = read_zipmap_length(&mut reader)?.ok_or(RdbError::TruncatedZipmap)?;
            let free = reader.read_u8()?;
            let value = read_exact(&mut reader, value_length as usize)?;

            self.formatter
                .hset(key, &Value::Bytes(field), &zipmap_value(value))?;

            if free > 0 {
                read_exact(&mut reader, free as usize)?;
            }
        }

        self.formatter.end_hash(key)
    }

    fn read_set_intset(&mut self, key: &[u8]) -> RdbOk {
        let intset = self.read_blob()?;
        let raw_length = intset.len() as u64;

        let mut reader = Cursor::new(intset);
        let byte_size = reader.read_u32::<LittleEndian>()?;
        let intset_length = reader.read_u32::<LittleEndian>()?;

        self.formatter.start_set(
            key,
            intset_length,
            self.last_expiretime,
            EncodingType::Intset(raw_length),
        )?;

        for _ in 0..intset_length {
            let val = match byte_size {
                2 => reader.read_u16::<LittleEndian>()? as i64,
                4 => reader.read_u32::<LittleEndian>()? as i64,
                8 => reader.read_u64::<LittleEndian>()? as i64,
                _ => return Err(RdbError::BadIntsetEncoding(byte_size)),
            };

            self.formatter.sadd(key, &Value::Integer(val))?;
        }

        self.formatter.end_set(key)
    }

    fn read_list_ziplist(&mut self, key: &[u8]) -> RdbOk {
        let ziplist = self.read_blob()?;
        let raw_length = ziplist.len() as u64;

        let mut reader = Cursor::new(ziplist);
        let (_zlbytes, _zltail, zllen) = read_ziplist_metadata(&mut reader)?;

        self.formatter.start_list(
            key,
            zllen as u32,
            self.last_expiretime,
            EncodingType::Ziplist(raw_length),
        )?;

        for _ in 0..zllen {
            let entry = read_ziplist_entry(&mut reader)?;
            self.formatter.rpush(key, &entry)?;
        }

        check_ziplist_end(&mut reader)?;
        self.formatter.end_list(key)
    }

    fn read_hash_ziplist(&mut self, key: &[u8]) -> RdbOk {
        let ziplist = self.read_blob()?;
        let raw_length = ziplist.len() as u64;

        let mut reader = Cursor::new(ziplist);
        let (_zlbytes, _zltail, zllen) = read_ziplist_metadata(&mut reader)?;

        if zllen % 2 != 0 {
            return Err(RdbError::BadZiplistPairCount(zllen));
        }
        let pairs = zllen / 2;

        self.formatter.start_hash(
            key,
            pairs as u32,
            self.last_expiretime,
            EncodingType::Ziplist(raw_length),
        )?;

        for _ in 0..pairs {
            let field = read_ziplist_entry(&mut reader)?;
            let value = read_ziplist_entry(&mut reader)?;
            self.formatter.hset(key, &field, &value)?;
        }

        check_ziplist_end(&mut reader)?;
        self.formatter.end_hash(key)
    }

    fn read_sortedset_ziplist(&mut self, key: &[u8]) -> RdbOk {
        let ziplist = self.read_blob()?;
        let raw_length = ziplist.len() as u64;

        let mut reader = Cursor::new(ziplist);
        let (_zlbytes, _zltail, zllen) = read_ziplist_metadata(&mut reader)?;

        if zllen % 2 != 0 {
            return Err(RdbError::BadZiplistPairCount(zllen));
        }
        let pairs = zllen / 2;

        self.formatter.start_sorted_set(
            key,
            pairs as u32,
            self.last_expiretime,
            EncodingType::Ziplist(raw_length),
        )?;

        for _ in 0..pairs {
            let member = read_ziplist_entry(&mut reader)?;
            let score = read_ziplist_entry(&mut reader)?;
            self.formatter
                .zadd(key, score_from_value(&score)?, &member)?;
        }

        check_ziplist_end(&mut reader)?;
        self.formatter.end_sorted_set(key)
    }

    fn skip(&mut self, skip_bytes: u64) -> RdbOk {
        let copied = io::copy(&mut (&mut self.input).take(skip_bytes), &mut io::sink())?;
        if copied == skip_bytes {
            Ok(())
        } else {
            Err(RdbError::UnexpectedEof)
        }
    }

    fn skip_blob(&mut self) -> RdbOk {
        let (len, is_encoded) = read_length_with_encoding(&mut self.input)?;

        let skip_bytes = if is_encoded {
            match len {
                encoding::INT8 => 1,
                encoding::INT16 => 2,
                encoding::INT32 => 4,
                encoding::LZF => {
                    let compressed_length = read_length(&mut self.input)?;
                    let _real_length = read_length(&mut self.input)?;
                    compressed_length
                }
                _ => return Err(RdbError::MalformedString(len)),
            }
        } else {
            len
        };

        self.skip(skip_bytes as u64)
    }

    fn skip_object(&mut self, enc_type: u8) -> RdbOk {
        let blobs_to_skip = match enc_type {
            encoding_type::STRING
            | encoding_type::HASH_ZIPMAP
            | encoding_type::LIST_ZIPLIST
            | encoding_type::SET_INTSET
            | encoding_type::ZSET_ZIPLIST
            | encoding_type::HASH_ZIPLIST => 1,
            encoding_type::LIST | encoding_type::SET => read_length(&mut self.input)?,
            encoding_type::HASH => read_length(&mut self.input)? * 2,
            encoding_type::ZSET => {
                let entries = read_length(&mut self.input)?;
                for _ in 0..entries {
                    self.skip_blob()?;
                    let score_length = self.input.read_u8()?;
                    match score_length {
                        // NaN and infinity markers carry no payload.
                        253 | 254 | 255 => {}
                        n => self.skip(n as u64)?,
                    }
                }
                0
            }
            _ => return Err(RdbError::UnknownType(enc_type)),
        };

        for _ in 0..blobs_to_skip {
            self.skip_blob()?;
        }

        Ok(())
    }

    fn skip_key_and_object(&mut self, enc_type: u8) -> RdbOk {
        self.skip_blob()?;
        self.skip_object(enc_type)
    }
}

/// Decodes one ziplist entry from the in-memory blob.
///
/// The leading previous-entry length (1 or 5 bytes) only matters for
/// backwards traversal; it is read to keep the cursor aligned.
fn read_ziplist_entry<T: Read>(ziplist: &mut T) -> RdbResult<Value> {
    if ziplist.read_u8()? == 254 {
        ziplist.read_u32::<LittleEndian>()?;
    }

    let header = ziplist.read_u8()?;

    let length = match (header & 0xC0) >> 6 {
        0 => (header & 0x3F) as u64,
        1 => {
            let next_byte = ziplist.read_u8()?;
            (((header & 0x3F) as u64) << 8) | next_byte as u64
        }
        2 => {
            // String lengths with this header are big-endian.
            ziplist.read_u32::<BigEndian>()? as u64
        }
        _ => {
            let number = match header {
                0xC0 => ziplist.read_i16::<LittleEndian>()? as i64,
                0xD0 => ziplist.read_i32::<LittleEndian>()? as i64,
                0xE0 => ziplist.read_i64::<LittleEndian>()?,
                0xF0 => ziplist.read_i24::<LittleEndian>()? as i64,
                0xFE => ziplist.read_i8()? as i64,
                0xF1..=0xFD => (header - 0xF1) as i64,
                _ => return Err(RdbError::BadZiplistEntry(header)),
            };

            return Ok(Value::Integer(number));
        }
    };

    let raw = read_exact(ziplist, length as usize)?;
    Ok(Value::Bytes(raw))
}

fn check_ziplist_end<T: Read>(reader: &mut T) -> RdbOk {
    let last_byte = reader.read_u8()?;
    if last_byte == 0xFF {
        Ok(())
    } else {
        Err(RdbError::BadZiplistEnd(last_byte))
    }
}
