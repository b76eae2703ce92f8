//! Per-directory store header
//!
//! Every database directory carries a small `HEADER` file recording which
//! engine kind owns the directory, which value-codec version wrote it, and
//! when it was created. The header is read at open; an engine-kind or
//! codec-version mismatch is fatal unless the caller asked for a rebuild.
//!
//! ## Layout
//!
//! ```text
//! [magic "FLAXKV"][format: u16][engine: u8][codec: u16][created_at_ms: u64][crc32: u32]
//! ```
//!
//! All integers big-endian. The CRC covers every preceding byte.

use crate::EngineKind;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flaxkv_core::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header magic bytes
pub const MAGIC: &[u8; 6] = b"FLAXKV";

/// Version of the header layout itself
pub const FORMAT_VERSION: u16 = 1;

/// Name of the header file inside a database directory
pub const HEADER_FILE: &str = "HEADER";

const HEADER_LEN: usize = 6 + 2 + 1 + 2 + 8 + 4;

/// Store metadata persisted per database directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Engine kind that owns the directory
    pub engine: EngineKind,
    /// Value-codec version in effect when the store was created
    pub codec_version: u16,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
}

impl Header {
    /// Build a header for a freshly created store
    pub fn new(engine: EngineKind, codec_version: u16) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            engine,
            codec_version,
            created_at_ms,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(MAGIC);
        buf.write_u16::<BigEndian>(FORMAT_VERSION).expect("vec write");
        buf.push(self.engine.as_byte());
        buf.write_u16::<BigEndian>(self.codec_version)
            .expect("vec write");
        buf.write_u64::<BigEndian>(self.created_at_ms)
            .expect("vec write");
        let crc = crc32fast::hash(&buf);
        buf.write_u32::<BigEndian>(crc).expect("vec write");
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != HEADER_LEN {
            return Err(Error::corruption(format!(
                "header is {} bytes, expected {}",
                buf.len(),
                HEADER_LEN
            )));
        }
        let (body, crc_bytes) = buf.split_at(HEADER_LEN - 4);
        let expected = Cursor::new(crc_bytes)
            .read_u32::<BigEndian>()
            .map_err(|_| Error::corruption("header CRC unreadable"))?;
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(Error::corruption(format!(
                "header CRC mismatch: expected {expected:08x}, got {actual:08x}"
            )));
        }

        let mut cursor = Cursor::new(body);
        let mut magic = [0u8; 6];
        std::io::Read::read_exact(&mut cursor, &mut magic)
            .map_err(|_| Error::corruption("header magic unreadable"))?;
        if &magic != MAGIC {
            return Err(Error::corruption("bad header magic"));
        }
        let format = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| Error::corruption("header format unreadable"))?;
        if format != FORMAT_VERSION {
            return Err(Error::corruption(format!(
                "unsupported header format {format}"
            )));
        }
        let engine_byte = cursor
            .read_u8()
            .map_err(|_| Error::corruption("header engine unreadable"))?;
        let engine = EngineKind::from_byte(engine_byte)
            .ok_or_else(|| Error::corruption(format!("unknown engine tag {engine_byte}")))?;
        let codec_version = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| Error::corruption("header codec version unreadable"))?;
        let created_at_ms = cursor
            .read_u64::<BigEndian>()
            .map_err(|_| Error::corruption("header timestamp unreadable"))?;

        Ok(Self {
            engine,
            codec_version,
            created_at_ms,
        })
    }
}

/// Write `header` to `dir/HEADER`
pub fn write_header(dir: &Path, header: &Header) -> Result<()> {
    std::fs::write(dir.join(HEADER_FILE), header.encode())?;
    Ok(())
}

/// Read the header from `dir/HEADER`
///
/// # Errors
///
/// `Error::Corruption` if the file is malformed; `Error::Engine` if it
/// cannot be read at all.
pub fn read_header(dir: &Path) -> Result<Header> {
    let buf = std::fs::read(dir.join(HEADER_FILE))?;
    Header::decode(&buf)
}

/// Whether `dir` contains a header file
pub fn header_exists(dir: &Path) -> bool {
    dir.join(HEADER_FILE).exists()
}
