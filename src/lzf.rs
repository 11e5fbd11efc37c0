//! LZF decompression for compressed string payloads.
//!
//! Compressed strings are stored as `(compressed_length, uncompressed_length,
//! bytes)`; the declared uncompressed length is an exact post-condition, not
//! a hint.

use crate::types::{RdbError, RdbResult};

/// Decompresses `input` into a buffer of exactly `expected_length` bytes.
///
/// The stream is a sequence of control bytes. A control byte below 32 starts
/// a literal run of `ctrl + 1` bytes. Anything else is a back-reference into
/// the output produced so far: the top three bits hold the copy length
/// (extended by one byte when saturated), the rest combines with the next
/// byte into the back-offset.
pub fn decompress(input: &[u8], expected_length: usize) -> RdbResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_length);
    let mut i = 0;

    while i < input.len() {
        let ctrl = input[i] as usize;
        i += 1;

        if ctrl < 32 {
            let run = ctrl + 1;
            if i + run > input.len() {
                return Err(RdbError::UnexpectedEof);
            }
            out.extend_from_slice(&input[i..i + run]);
            i += run;
        } else {
            let mut len = ctrl >> 5;
            if len == 7 {
                len += *input.get(i).ok_or(RdbError::UnexpectedEof)? as usize;
                i += 1;
            }

            let low = *input.get(i).ok_or(RdbError::UnexpectedEof)? as usize;
            i += 1;

            let reference = out
                .len()
                .checked_sub(((ctrl & 0x1F) << 8) + low + 1)
                .ok_or(RdbError::BadLzfBackref)?;

            // The referenced region may overlap the bytes being appended
            // (run-length expansion), so this must stay a byte-wise copy.
            for offset in 0..len + 2 {
                let byte = out[reference + offset];
                out.push(byte);
            }
        }
    }

    if out.len() != expected_length {
        return Err(RdbError::LzfLengthMismatch {
            expected: expected_length,
            actual: out.len(),
        });
    }

    Ok(out)
}
