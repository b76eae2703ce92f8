//! Logical keys and their canonical byte encoding
//!
//! A key is an opaque, hashable value drawn from integers, floats, booleans,
//! text, byte strings, and fixed-length ordered groups of such. Two keys are
//! equal iff their canonical encodings are equal, which has two consequences
//! the std derives would get wrong:
//!
//! - `Float(-0.0)` and `Float(0.0)` encode differently, so they are
//!   *different* keys (`f64::eq` would conflate them);
//! - NaN never encodes, so it can never reach the equality relation.
//!
//! `PartialEq`, `Eq`, and `Hash` are therefore implemented by hand over the
//! float bit pattern.
//!
//! ## Wire Format
//!
//! A self-describing tag byte followed by a canonical payload:
//!
//! ```text
//! I <width:u8=8> <i64 big-endian>     integer
//! F <f64 bits big-endian>             float (NaN rejected)
//! B <0|1>                             boolean
//! S <utf-8 bytes>                     text
//! Y <raw bytes>                       byte string
//! T <count:u32 BE> (<len:u32 BE> <element>)*   group
//! ```
//!
//! Distinct types never collide: integer `1`, float `1.0`, and text `"1"`
//! carry different tags.

use crate::error::{Error, Result};
use crate::limits::Limits;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::hash::{Hash, Hasher};
use std::io::Cursor;

const TAG_INT: u8 = b'I';
const TAG_FLOAT: u8 = b'F';
const TAG_BOOL: u8 = b'B';
const TAG_STR: u8 = b'S';
const TAG_BYTES: u8 = b'Y';
const TAG_GROUP: u8 = b'T';

// Integers are always written at full width; the width byte keeps the
// format self-describing if narrower widths are ever emitted.
const INT_WIDTH: u8 = 8;

/// A logical store key
#[derive(Debug, Clone)]
pub enum Key {
    /// Signed integer
    Int(i64),
    /// IEEE-754 double (NaN is not a valid key)
    Float(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 text
    Str(String),
    /// Raw byte string
    Bytes(Vec<u8>),
    /// Fixed-length ordered group of keys
    Group(Vec<Key>),
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a == b,
            (Key::Float(a), Key::Float(b)) => a.to_bits() == b.to_bits(),
            (Key::Bool(a), Key::Bool(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Bytes(a), Key::Bytes(b)) => a == b,
            (Key::Group(a), Key::Group(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Key::Int(v) => {
                state.write_u8(TAG_INT);
                v.hash(state);
            }
            Key::Float(v) => {
                state.write_u8(TAG_FLOAT);
                v.to_bits().hash(state);
            }
            Key::Bool(v) => {
                state.write_u8(TAG_BOOL);
                v.hash(state);
            }
            Key::Str(v) => {
                state.write_u8(TAG_STR);
                v.hash(state);
            }
            Key::Bytes(v) => {
                state.write_u8(TAG_BYTES);
                v.hash(state);
            }
            Key::Group(v) => {
                state.write_u8(TAG_GROUP);
                v.hash(state);
            }
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v as i64)
    }
}

impl From<f64> for Key {
    fn from(v: f64) -> Self {
        Key::Float(v)
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

impl From<Vec<u8>> for Key {
    fn from(v: Vec<u8>) -> Self {
        Key::Bytes(v)
    }
}

impl From<&[u8]> for Key {
    fn from(v: &[u8]) -> Self {
        Key::Bytes(v.to_vec())
    }
}

impl From<Vec<Key>> for Key {
    fn from(v: Vec<Key>) -> Self {
        Key::Group(v)
    }
}

/// Encode a key using default limits
///
/// # Errors
///
/// Returns `Error::Encoding` for NaN floats and for keys whose encoding
/// exceeds `Limits::max_key_bytes`.
pub fn encode_key(key: &Key) -> Result<Vec<u8>> {
    encode_key_with_limits(key, &Limits::default())
}

/// Encode a key with custom limits
pub fn encode_key_with_limits(key: &Key, limits: &Limits) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(16);
    write_key(key, &mut buf)?;
    if buf.len() > limits.max_key_bytes {
        return Err(Error::encoding(format!(
            "encoded key is {} bytes, maximum is {}",
            buf.len(),
            limits.max_key_bytes
        )));
    }
    Ok(buf)
}

fn write_key(key: &Key, buf: &mut Vec<u8>) -> Result<()> {
    match key {
        Key::Int(v) => {
            buf.push(TAG_INT);
            buf.push(INT_WIDTH);
            buf.write_i64::<BigEndian>(*v).expect("vec write");
        }
        Key::Float(v) => {
            if v.is_nan() {
                return Err(Error::encoding("NaN is not a valid key"));
            }
            buf.push(TAG_FLOAT);
            buf.write_u64::<BigEndian>(v.to_bits()).expect("vec write");
        }
        Key::Bool(v) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*v));
        }
        Key::Str(v) => {
            buf.push(TAG_STR);
            buf.extend_from_slice(v.as_bytes());
        }
        Key::Bytes(v) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(v);
        }
        Key::Group(elems) => {
            buf.push(TAG_GROUP);
            let count = u32::try_from(elems.len())
                .map_err(|_| Error::encoding("group has too many elements"))?;
            buf.write_u32::<BigEndian>(count).expect("vec write");
            for elem in elems {
                let mut inner = Vec::with_capacity(16);
                write_key(elem, &mut inner)?;
                let len = u32::try_from(inner.len())
                    .map_err(|_| Error::encoding("group element too large"))?;
                buf.write_u32::<BigEndian>(len).expect("vec write");
                buf.extend_from_slice(&inner);
            }
        }
    }
    Ok(())
}

/// Decode a key from its canonical encoding
///
/// Decoding is strict: an unknown tag, a bad width byte, truncation, or
/// trailing bytes are all `Error::Encoding`.
pub fn decode_key(buf: &[u8]) -> Result<Key> {
    let mut cursor = Cursor::new(buf);
    let key = read_key(&mut cursor, buf)?;
    if (cursor.position() as usize) != buf.len() {
        return Err(Error::encoding("trailing bytes after key"));
    }
    Ok(key)
}

fn read_key(cursor: &mut Cursor<&[u8]>, buf: &[u8]) -> Result<Key> {
    let tag = cursor
        .read_u8()
        .map_err(|_| Error::encoding("empty key encoding"))?;
    match tag {
        TAG_INT => {
            let width = cursor
                .read_u8()
                .map_err(|_| Error::encoding("truncated integer key"))?;
            if width != INT_WIDTH {
                return Err(Error::encoding(format!(
                    "unsupported integer width {width}"
                )));
            }
            let v = cursor
                .read_i64::<BigEndian>()
                .map_err(|_| Error::encoding("truncated integer key"))?;
            Ok(Key::Int(v))
        }
        TAG_FLOAT => {
            let bits = cursor
                .read_u64::<BigEndian>()
                .map_err(|_| Error::encoding("truncated float key"))?;
            let v = f64::from_bits(bits);
            if v.is_nan() {
                return Err(Error::encoding("NaN is not a valid key"));
            }
            Ok(Key::Float(v))
        }
        TAG_BOOL => {
            let b = cursor
                .read_u8()
                .map_err(|_| Error::encoding("truncated bool key"))?;
            match b {
                0 => Ok(Key::Bool(false)),
                1 => Ok(Key::Bool(true)),
                other => Err(Error::encoding(format!("invalid bool byte {other}"))),
            }
        }
        TAG_STR => {
            let rest = remaining(cursor, buf);
            let s = std::str::from_utf8(rest)
                .map_err(|e| Error::encoding(format!("invalid UTF-8 in key: {e}")))?;
            let key = Key::Str(s.to_string());
            cursor.set_position(buf.len() as u64);
            Ok(key)
        }
        TAG_BYTES => {
            let rest = remaining(cursor, buf).to_vec();
            cursor.set_position(buf.len() as u64);
            Ok(Key::Bytes(rest))
        }
        TAG_GROUP => {
            let count = cursor
                .read_u32::<BigEndian>()
                .map_err(|_| Error::encoding("truncated group key"))?;
            let mut elems = Vec::with_capacity(count.min(64) as usize);
            for _ in 0..count {
                let len = cursor
                    .read_u32::<BigEndian>()
                    .map_err(|_| Error::encoding("truncated group element"))?
                    as usize;
                let start = cursor.position() as usize;
                let end = start
                    .checked_add(len)
                    .filter(|&e| e <= buf.len())
                    .ok_or_else(|| Error::encoding("group element overruns buffer"))?;
                let elem = decode_key(&buf[start..end])?;
                cursor.set_position(end as u64);
                elems.push(elem);
            }
            Ok(Key::Group(elems))
        }
        other => Err(Error::encoding(format!("unknown key tag 0x{other:02x}"))),
    }
}

fn remaining<'a>(cursor: &Cursor<&[u8]>, buf: &'a [u8]) -> &'a [u8] {
    &buf[cursor.position() as usize..]
}
