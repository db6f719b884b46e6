use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use reftable_config::StackError;
use reftable_record::{LogRecord, LogUpdate, Record, RefRecord, RefTarget};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::format::{read_footer, Footer, RECORD_KIND_LOG, RECORD_KIND_REF};

/// Maximum name/message/hash size we'll allocate during reads (1 MiB).
/// Prevents OOM on a corrupt or hostile file.
const MAX_FIELD_BYTES: usize = 1024 * 1024;

/// Reads an immutable table file for point lookups.
///
/// On [`open`](TableReader::open) the ref and log index sections are loaded
/// into memory, along with the bloom filter. A persistent file handle is
/// kept open for the lifetime of the reader, wrapped in a `Mutex` so lookups
/// can be served through a shared `&self`.
pub struct TableReader {
    #[allow(dead_code)]
    path: PathBuf,
    ref_index: BTreeMap<String, u64>,
    log_index: BTreeMap<(String, u64), u64>,
    bloom: BloomFilter,
    file: Mutex<BufReader<File>>,
    footer: Footer,
}

impl TableReader {
    /// Opens a table file and loads its index sections and bloom filter.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StackError> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)?;
        let filesize = f.metadata()?.len();

        let footer = read_footer(&mut f)?;
        if footer.bloom_offset >= filesize
            || footer.ref_index_offset >= filesize
            || footer.log_index_offset > filesize
            || footer.ref_index_offset < footer.bloom_offset
            || footer.log_index_offset < footer.ref_index_offset
        {
            return Err(StackError::Api("corrupt table: section offsets out of order".to_string()));
        }

        f.seek(SeekFrom::Start(footer.bloom_offset))?;
        let bloom = BloomFilter::read_from(&mut f)?;

        f.seek(SeekFrom::Start(footer.ref_index_offset))?;
        let mut ref_index = BTreeMap::new();
        for _ in 0..footer.ref_count {
            let refname = read_name_string(&mut f)?;
            let offset = f.read_u64::<LittleEndian>()?;
            ref_index.insert(refname, offset);
        }

        f.seek(SeekFrom::Start(footer.log_index_offset))?;
        let mut log_index = BTreeMap::new();
        for _ in 0..footer.log_count {
            let refname = read_name_string(&mut f)?;
            let update_index = f.read_u64::<LittleEndian>()?;
            let offset = f.read_u64::<LittleEndian>()?;
            log_index.insert((refname, update_index), offset);
        }

        f.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path_buf,
            ref_index,
            log_index,
            bloom,
            file: Mutex::new(BufReader::new(f)),
            footer,
        })
    }

    /// The declared update-index range this table covers (§3, §9 invariant
    /// I2: "non-overlapping ascending update-index ranges").
    #[must_use]
    pub fn update_index_range(&self) -> (u64, u64) {
        (self.footer.min_update_index, self.footer.max_update_index)
    }

    /// The hash format this table's ref values are encoded with.
    #[must_use]
    pub fn hash_format_id(&self) -> u32 {
        self.footer.hash_format_id
    }

    /// `true` if this table holds no ref records and no log records for
    /// `refname` — a cheap negative check before consulting the indices.
    fn may_contain(&self, refname: &str) -> bool {
        self.bloom.may_contain(refname.as_bytes())
    }

    /// Looks up the current reference record for `refname` in this table.
    pub fn get_ref(&self, refname: &str) -> Result<Option<RefRecord>, StackError> {
        if !self.may_contain(refname) {
            return Ok(None);
        }
        let offset = match self.ref_index.get(refname) {
            Some(&o) => o,
            None => return Ok(None),
        };
        match self.read_record_at(offset)? {
            Record::Ref(r) => Ok(Some(r)),
            Record::Log(_) => Err(StackError::Api("index pointed at a log record".to_string())),
        }
    }

    /// Looks up the newest log record for `refname` in this table.
    pub fn get_log_newest(&self, refname: &str) -> Result<Option<LogRecord>, StackError> {
        if !self.may_contain(refname) {
            return Ok(None);
        }
        let lower = (refname.to_string(), 0u64);
        let upper = (refname.to_string(), u64::MAX);
        let offset = match self.log_index.range(lower..=upper).next_back() {
            Some((_, &o)) => o,
            None => return Ok(None),
        };
        match self.read_record_at(offset)? {
            Record::Log(l) => Ok(Some(l)),
            Record::Ref(_) => Err(StackError::Api("index pointed at a ref record".to_string())),
        }
    }

    /// Looks up the log record for `(refname, update_index)` exactly.
    pub fn get_log_at(&self, refname: &str, update_index: u64) -> Result<Option<LogRecord>, StackError> {
        if !self.may_contain(refname) {
            return Ok(None);
        }
        let offset = match self.log_index.get(&(refname.to_string(), update_index)) {
            Some(&o) => o,
            None => return Ok(None),
        };
        match self.read_record_at(offset)? {
            Record::Log(l) => Ok(Some(l)),
            Record::Ref(_) => Err(StackError::Api("index pointed at a ref record".to_string())),
        }
    }

    /// Iterates over all refnames held in this table's ref section, in
    /// ascending order.
    pub fn ref_names(&self) -> impl Iterator<Item = &str> {
        self.ref_index.keys().map(|s| s.as_str())
    }

    /// Iterates over all `(refname, update_index)` keys in this table's log
    /// section, in ascending order.
    pub fn log_keys(&self) -> impl Iterator<Item = &(String, u64)> {
        self.log_index.keys()
    }

    fn read_record_at(&self, offset: u64) -> Result<Record, StackError> {
        let mut f = self
            .file
            .lock()
            .map_err(|_| StackError::Api("table reader lock poisoned".to_string()))?;
        f.seek(SeekFrom::Start(offset))?;

        let stored_crc = f.read_u32::<LittleEndian>()?;

        let mut body = Vec::with_capacity(64);
        let mut tee = Tee {
            inner: &mut *f,
            buf: &mut body,
        };

        let kind = tee.read_u8()?;
        let refname = read_name_string(&mut tee)?;
        let update_index = tee.read_u64::<LittleEndian>()?;
        let live = tee.read_u8()?;

        let record = match kind {
            RECORD_KIND_REF => {
                if live == 0 {
                    Record::Ref(RefRecord::tombstone(refname, update_index))
                } else {
                    let target_kind = tee.read_u8()?;
                    let target = if target_kind == 0 {
                        RefTarget::Value(read_name_bytes(&mut tee)?)
                    } else {
                        RefTarget::Symbolic(read_name_string(&mut tee)?)
                    };
                    Record::Ref(RefRecord {
                        refname,
                        update_index,
                        target: Some(target),
                    })
                }
            }
            RECORD_KIND_LOG => {
                if live == 0 {
                    Record::Log(LogRecord::tombstone(refname, update_index))
                } else {
                    let time = tee.read_u64::<LittleEndian>()?;
                    let email = read_name_string(&mut tee)?;
                    let old_hash = read_optional_hash(&mut tee)?;
                    let new_hash = read_optional_hash(&mut tee)?;
                    let message = read_name_string(&mut tee)?;
                    Record::Log(LogRecord {
                        refname,
                        update_index,
                        update: Some(LogUpdate {
                            time,
                            email,
                            old_hash,
                            new_hash,
                            message,
                        }),
                    })
                }
            }
            other => return Err(StackError::Api(format!("unknown record kind {}", other))),
        };

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let actual_crc = hasher.finalize();
        if actual_crc != stored_crc {
            return Err(StackError::Api(format!(
                "CRC mismatch at offset {}: expected {:#010x}, got {:#010x}",
                offset, stored_crc, actual_crc
            )));
        }

        Ok(record)
    }
}

/// Wraps a reader, copying every byte it yields into `buf`, so the caller
/// can verify a CRC over exactly what was parsed without re-reading.
struct Tee<'a, R> {
    inner: &'a mut R,
    buf: &'a mut Vec<u8>,
}

impl<'a, R: Read> Read for Tee<'a, R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(out)?;
        self.buf.extend_from_slice(&out[..n]);
        Ok(n)
    }
}

fn read_name_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, StackError> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    if len > MAX_FIELD_BYTES {
        return Err(StackError::Api(format!("field length {} exceeds maximum", len)));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_name_string<R: Read>(r: &mut R) -> Result<String, StackError> {
    let bytes = read_name_bytes(r)?;
    String::from_utf8(bytes).map_err(|_| StackError::Api("field is not valid UTF-8".to_string()))
}

fn read_optional_hash<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, StackError> {
    let present = r.read_u8()?;
    if present == 0 {
        Ok(None)
    } else {
        Ok(Some(read_name_bytes(r)?))
    }
}
