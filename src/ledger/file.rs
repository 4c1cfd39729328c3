//! Newline-delimited JSON ledger file.
//!
//! ## Torn Writes
//!
//! Every record is written as one `write_all` of `{...}\n`, so a crash can
//! leave at most a prefix of a line behind. Every complete record line ends
//! in `}`; a line that does not is treated as a torn write, logged and
//! skipped. A line that looks complete but does not parse is corruption and
//! halts the sweep.
//!
//! Before appending, a missing trailing newline is restored so the new record
//! always starts on its own line. Existing bytes are never modified.

use super::{Ledger, ResultRecord};
use crate::data::SubjectId;
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ledger file name for a subject (`result_sub01.json`).
#[must_use]
pub fn subject_file_name(subject: SubjectId) -> String {
    format!("result_sub{:02}.json", subject.0)
}

/// File-backed ledger, one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    /// Ledger at `path`. The file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger for `subject` inside `dir`.
    #[must_use]
    pub fn for_subject(dir: impl AsRef<Path>, subject: SubjectId) -> Self {
        Self::new(dir.as_ref().join(subject_file_name(subject)))
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::LedgerIo {
            path: self.path.clone(),
            source,
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<ResultRecord>> {
        let mut records = Vec::new();
        for (i, raw) in bytes.split(|&b| b == b'\n').enumerate() {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !line.ends_with('}') {
                warn!(
                    path = %self.path.display(),
                    line = i + 1,
                    "skipping torn ledger line"
                );
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| Error::LedgerCorrupt {
                path: self.path.clone(),
                line: i + 1,
                reason: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Serialize `record` as one JSON line body.
    ///
    /// Non-finite numbers are refused: `serde_json` writes them as `null`,
    /// which would never parse back.
    fn encode(&self, record: &ResultRecord) -> Result<String> {
        let numbers = [
            ("score", record.score()),
            ("train_time", record.train_time()),
            ("test_time", record.test_time()),
            ("fs", record.fs()),
        ];
        if let Some((field, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(self.io_error(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{field} of {} is not finite ({value})", record.model_name()),
            )));
        }
        serde_json::to_string(record).map_err(|e| self.io_error(io::Error::other(e)))
    }

    /// Whether the file is non-empty and its last byte is not a newline.
    fn has_unterminated_tail(file: &mut fs::File) -> io::Result<bool> {
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}

impl Ledger for JsonlLedger {
    fn records(&self) -> Result<Vec<ResultRecord>> {
        match fs::read(&self.path) {
            Ok(bytes) => self.parse(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        let body = self.encode(record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut line = String::new();
        if Self::has_unterminated_tail(&mut file).map_err(|e| self.io_error(e))? {
            line.push('\n');
        }
        line.push_str(&body);
        line.push('\n');

        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data())
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), model = record.model_name(), "ledger append");
        Ok(())
    }
}
