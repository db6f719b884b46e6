//! Table binary format constants and footer read/write helpers.
//!
//! ## Footer (56 bytes) — magic `RTB1` (`0x5254_4231`)
//!
//! ```text
//! [hash_format_id: u32][min_update_index: u64][max_update_index: u64]
//! [ref_count: u32][log_count: u32][bloom_offset: u64]
//! [ref_index_offset: u64][log_index_offset: u64][magic: u32]
//! ```
//!
//! The reader reads the last 4 bytes (magic) first to confirm the file is a
//! table of this format, then seeks back to the fixed footer start.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Result as IoResult, Seek, SeekFrom, Write};

/// Magic number identifying this table format (ASCII "RTB1").
pub const TABLE_MAGIC: u32 = 0x5254_4231;

/// Size of the footer in bytes.
pub const FOOTER_BYTES: u64 = 4 + 8 + 8 + 4 + 4 + 8 + 8 + 8 + 4;

/// Record kind discriminant stored in the data section.
pub const RECORD_KIND_REF: u8 = 0;
/// Record kind discriminant stored in the data section.
pub const RECORD_KIND_LOG: u8 = 1;

/// Parsed table footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Hash format adopted by this table (§3, §9 "Hash format id adoption").
    pub hash_format_id: u32,
    /// Lowest update index any record in this table was written at.
    pub min_update_index: u64,
    /// Highest update index any record in this table was written at.
    pub max_update_index: u64,
    /// Number of reference records in the data section.
    pub ref_count: u32,
    /// Number of log records in the data section.
    pub log_count: u32,
    /// Byte offset where the bloom filter section starts.
    pub bloom_offset: u64,
    /// Byte offset where the ref index section starts.
    pub ref_index_offset: u64,
    /// Byte offset where the log index section starts.
    pub log_index_offset: u64,
}

impl Footer {
    /// Writes this footer to `w`, terminated by the magic.
    pub fn write_to<W: Write>(&self, w: &mut W) -> IoResult<()> {
        w.write_u32::<LittleEndian>(self.hash_format_id)?;
        w.write_u64::<LittleEndian>(self.min_update_index)?;
        w.write_u64::<LittleEndian>(self.max_update_index)?;
        w.write_u32::<LittleEndian>(self.ref_count)?;
        w.write_u32::<LittleEndian>(self.log_count)?;
        w.write_u64::<LittleEndian>(self.bloom_offset)?;
        w.write_u64::<LittleEndian>(self.ref_index_offset)?;
        w.write_u64::<LittleEndian>(self.log_index_offset)?;
        w.write_u32::<LittleEndian>(TABLE_MAGIC)?;
        Ok(())
    }
}

/// Reads the footer from `r`, validating the magic.
///
/// On return the cursor position is unspecified; callers seek explicitly
/// before their next read.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> IoResult<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < FOOTER_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for table footer",
        ));
    }

    r.seek(SeekFrom::End(-4))?;
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != TABLE_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown table magic: {:#x}", magic),
        ));
    }

    r.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
    let hash_format_id = r.read_u32::<LittleEndian>()?;
    let min_update_index = r.read_u64::<LittleEndian>()?;
    let max_update_index = r.read_u64::<LittleEndian>()?;
    let ref_count = r.read_u32::<LittleEndian>()?;
    let log_count = r.read_u32::<LittleEndian>()?;
    let bloom_offset = r.read_u64::<LittleEndian>()?;
    let ref_index_offset = r.read_u64::<LittleEndian>()?;
    let log_index_offset = r.read_u64::<LittleEndian>()?;

    Ok(Footer {
        hash_format_id,
        min_update_index,
        max_update_index,
        ref_count,
        log_count,
        bloom_offset,
        ref_index_offset,
        log_index_offset,
    })
}
