use bloom::BloomFilter;
use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use reftable_config::StackError;
use reftable_record::{LogKey, LogRecord, RefKey, RefRecord, RefTarget};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use crate::format::{Footer, RECORD_KIND_LOG, RECORD_KIND_REF};

/// Default bloom filter false positive rate (1%).
const BLOOM_FPR: f64 = 0.01;

/// The outcome of [`TableWriter::finish`].
///
/// If the writer received zero records the temporary file is removed and
/// `path` is `None` — callers must treat this as "nothing was written" and
/// must not publish an entry for it (§9 "Supplying an empty write_cb").
pub struct FinishedTable {
    /// The temporary file's path, or `None` if the table was empty and was
    /// discarded. The caller is responsible for renaming this into its
    /// final `<lo>-<hi>-<suffix>` name.
    pub path: Option<PathBuf>,
    /// Total number of live and tombstone records written.
    pub record_count: usize,
    /// The hash format id this table was written with.
    pub hash_format_id: u32,
    /// Declared lower bound of this table's update-index range.
    pub min_update_index: u64,
    /// Declared upper bound of this table's update-index range.
    pub max_update_index: u64,
}

/// Writes reference and log records to a new, immutable table file.
///
/// Records must be fed in ascending key order (§3): ref records by refname,
/// log records by `(refname, update_index)` with update_index descending
/// within a name. The writer rejects anything out of order rather than
/// silently re-sorting it.
///
/// The caller must call [`TableWriter::set_limits`] before adding any
/// records, declaring the update-index range this table's contribution
/// covers (§4.3).
pub struct TableWriter {
    tmp_path: PathBuf,
    file: BufWriter<File>,
    hash_format_id: u32,
    exact_log_message: bool,
    min_update_index: u64,
    max_update_index: u64,
    limits_set: bool,
    last_ref_key: Option<RefKey>,
    last_log_key: Option<LogKey>,
    ref_index: Vec<(String, u64)>,
    log_index: Vec<((String, u64), u64)>,
    bloom_keys: Vec<Vec<u8>>,
    record_buf: Vec<u8>,
}

impl TableWriter {
    /// Opens a fresh temporary file at `tmp_path` to accumulate records into.
    ///
    /// `hash_format_id` is the hash format this table's contents use (§9
    /// "Hash format id adoption is per-directory"). `exact_log_message`
    /// mirrors [`reftable_config::StackOptions::exact_log_message`]: when
    /// `false`, log messages are normalized (no embedded newlines, a single
    /// trailing newline appended) on the way in.
    pub fn create(tmp_path: &Path, hash_format_id: u32, exact_log_message: bool) -> Result<Self, StackError> {
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)?;
        Ok(Self {
            tmp_path: tmp_path.to_path_buf(),
            file: BufWriter::new(raw),
            hash_format_id,
            exact_log_message,
            min_update_index: 0,
            max_update_index: 0,
            limits_set: false,
            last_ref_key: None,
            last_log_key: None,
            ref_index: Vec::new(),
            log_index: Vec::new(),
            bloom_keys: Vec::new(),
            record_buf: Vec::with_capacity(256),
        })
    }

    /// Declares the update-index range this contribution covers. Must be
    /// called before any `add_ref`/`add_log` call.
    pub fn set_limits(&mut self, min_update_index: u64, max_update_index: u64) -> Result<(), StackError> {
        if max_update_index < min_update_index {
            return Err(StackError::Api(format!(
                "set_limits: max {} is below min {}",
                max_update_index, min_update_index
            )));
        }
        self.min_update_index = min_update_index;
        self.max_update_index = max_update_index;
        self.limits_set = true;
        Ok(())
    }

    /// Total records written so far (live and tombstone, ref and log).
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.ref_index.len() + self.log_index.len()
    }

    fn check_limits(&self, update_index: u64) -> Result<(), StackError> {
        if !self.limits_set {
            return Err(StackError::Api(
                "set_limits must be called before adding records".to_string(),
            ));
        }
        if update_index < self.min_update_index || update_index > self.max_update_index {
            return Err(StackError::Api(format!(
                "update_index {} outside declared limits [{}, {}]",
                update_index, self.min_update_index, self.max_update_index
            )));
        }
        Ok(())
    }

    /// Appends a reference record. Refnames must arrive in strictly
    /// ascending order.
    pub fn add_ref(&mut self, rec: &RefRecord) -> Result<(), StackError> {
        self.check_limits(rec.update_index)?;

        let key = RefKey(rec.refname.clone());
        if let Some(last) = &self.last_ref_key {
            if key <= *last {
                return Err(StackError::Api(format!(
                    "ref records must be added in ascending refname order: {:?} after {:?}",
                    key.0, last.0
                )));
            }
        }

        self.record_buf.clear();
        self.record_buf.push(RECORD_KIND_REF);
        write_name(&mut self.record_buf, &rec.refname)?;
        self.record_buf.write_u64::<LittleEndian>(rec.update_index)?;
        match &rec.target {
            None => {
                self.record_buf.write_u8(0)?;
            }
            Some(RefTarget::Value(hash)) => {
                self.record_buf.write_u8(1)?;
                self.record_buf.write_u8(0)?;
                write_name(&mut self.record_buf, hash)?;
            }
            Some(RefTarget::Symbolic(target)) => {
                self.record_buf.write_u8(1)?;
                self.record_buf.write_u8(1)?;
                write_name(&mut self.record_buf, target.as_bytes())?;
            }
        }

        let offset = self.write_framed_record()?;
        self.bloom_keys.push(rec.refname.as_bytes().to_vec());
        self.ref_index.push((rec.refname.clone(), offset));
        self.last_ref_key = Some(key);
        Ok(())
    }

    /// Appends a log record. `(refname, update_index)` pairs must arrive in
    /// the order [`reftable_record::LogKey`] defines (refname ascending,
    /// update_index descending within a name).
    pub fn add_log(&mut self, rec: &LogRecord) -> Result<(), StackError> {
        self.check_limits(rec.update_index)?;

        let key = LogKey {
            refname: rec.refname.clone(),
            update_index: rec.update_index,
        };
        if let Some(last) = &self.last_log_key {
            if key <= *last {
                return Err(StackError::Api(format!(
                    "log records must be added in ascending (refname, update_index) order: {:?} after {:?}",
                    key, last
                )));
            }
        }

        self.record_buf.clear();
        self.record_buf.push(RECORD_KIND_LOG);
        write_name(&mut self.record_buf, &rec.refname)?;
        self.record_buf.write_u64::<LittleEndian>(rec.update_index)?;
        match &rec.update {
            None => {
                self.record_buf.write_u8(0)?;
            }
            Some(update) => {
                self.record_buf.write_u8(1)?;
                self.record_buf.write_u64::<LittleEndian>(update.time)?;
                write_name(&mut self.record_buf, update.email.as_bytes())?;
                write_optional_hash(&mut self.record_buf, &update.old_hash)?;
                write_optional_hash(&mut self.record_buf, &update.new_hash)?;

                let message = normalize_log_message(&update.message, self.exact_log_message)?;
                write_name(&mut self.record_buf, message.as_bytes())?;
            }
        }

        let offset = self.write_framed_record()?;
        self.bloom_keys.push(rec.refname.as_bytes().to_vec());
        self.log_index.push(((rec.refname.clone(), rec.update_index), offset));
        self.last_log_key = Some(key);
        Ok(())
    }

    fn write_framed_record(&mut self) -> Result<u64, StackError> {
        let mut hasher = Crc32::new();
        hasher.update(&self.record_buf);
        let crc = hasher.finalize();

        let offset = self.file.stream_position()?;
        self.file.write_u32::<LittleEndian>(crc)?;
        self.file.write_all(&self.record_buf)?;
        Ok(offset)
    }

    /// Flushes and fsyncs the accumulated records, writing the bloom filter,
    /// index sections, and footer.
    ///
    /// If no records were ever added, the temporary file is removed and
    /// [`FinishedTable::path`] is `None` — the caller must not publish an
    /// entry for it (§9 "Supplying an empty write_cb is a silent no-op").
    pub fn finish(mut self) -> Result<FinishedTable, StackError> {
        let record_count = self.record_count();
        if record_count == 0 {
            drop(self.file);
            let _ = std::fs::remove_file(&self.tmp_path);
            return Ok(FinishedTable {
                path: None,
                record_count: 0,
                hash_format_id: self.hash_format_id,
                min_update_index: self.min_update_index,
                max_update_index: self.max_update_index,
            });
        }

        let mut bloom = BloomFilter::new(self.bloom_keys.len().max(1), BLOOM_FPR);
        for key in &self.bloom_keys {
            bloom.insert(key);
        }
        let bloom_offset = self.file.stream_position()?;
        bloom.write_to(&mut self.file)?;

        let ref_index_offset = self.file.stream_position()?;
        for (refname, offset) in &self.ref_index {
            write_name(&mut self.file, refname.as_bytes())?;
            self.file.write_u64::<LittleEndian>(*offset)?;
        }

        let log_index_offset = self.file.stream_position()?;
        for ((refname, update_index), offset) in &self.log_index {
            write_name(&mut self.file, refname.as_bytes())?;
            self.file.write_u64::<LittleEndian>(*update_index)?;
            self.file.write_u64::<LittleEndian>(*offset)?;
        }

        let footer = Footer {
            hash_format_id: self.hash_format_id,
            min_update_index: self.min_update_index,
            max_update_index: self.max_update_index,
            ref_count: self.ref_index.len() as u32,
            log_count: self.log_index.len() as u32,
            bloom_offset,
            ref_index_offset,
            log_index_offset,
        };
        footer.write_to(&mut self.file)?;

        self.file.flush()?;
        self.file.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        Ok(FinishedTable {
            path: Some(self.tmp_path),
            record_count,
            hash_format_id: footer.hash_format_id,
            min_update_index: footer.min_update_index,
            max_update_index: footer.max_update_index,
        })
    }
}

fn write_name<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), StackError> {
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

fn write_optional_hash<W: Write>(w: &mut W, hash: &Option<Vec<u8>>) -> Result<(), StackError> {
    match hash {
        Some(h) => {
            w.write_u8(1)?;
            write_name(w, h)?;
        }
        None => {
            w.write_u8(0)?;
        }
    }
    Ok(())
}

/// Rejects embedded newlines unless `exact_log_message` opts out of
/// normalization, and otherwise ensures a single trailing newline.
fn normalize_log_message(message: &str, exact_log_message: bool) -> Result<String, StackError> {
    if exact_log_message {
        return Ok(message.to_string());
    }
    let body = message.strip_suffix('\n').unwrap_or(message);
    if body.contains('\n') {
        return Err(StackError::Api(
            "log message must not contain embedded newlines".to_string(),
        ));
    }
    Ok(format!("{}\n", body))
}
