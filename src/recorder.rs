//! Outcome recorders: one record per attempted posting.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::QuickApplyError;
use crate::state_machine::{ApplicationAttempt, OutcomeRecord};

pub trait OutcomeRecorder {
    fn record(&mut self, attempt: &ApplicationAttempt) -> Result<(), QuickApplyError>;
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonlRecorder {
    path: PathBuf,
}

impl JsonlRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Job ids already present in the file, for resuming a session. A
    /// missing file has none. Lines that do not parse, such as a record cut
    /// short by a crash, are skipped.
    pub fn recorded_ids(&self) -> Result<HashSet<String>, QuickApplyError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = HashSet::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OutcomeRecord>(&line) {
                Ok(record) => {
                    ids.insert(record.job_id);
                }
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    error = %e,
                    "skipping unreadable outcome record"
                ),
            }
        }
        Ok(ids)
    }
}

impl OutcomeRecorder for JsonlRecorder {
    fn record(&mut self, attempt: &ApplicationAttempt) -> Result<(), QuickApplyError> {
        let fail = |message: String| QuickApplyError::Record {
            job_id: attempt.posting.id.clone(),
            message,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| fail(format!("{}: {e}", dir.display())))?;
        }
        let mut line = serde_json::to_string(&OutcomeRecord::from_attempt(attempt))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| fail(format!("{}: {e}", self.path.display())))?;
        if !ends_with_newline(&mut file).map_err(|e| fail(format!("{}: {e}", self.path.display())))? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes())
            .map_err(|e| fail(format!("{}: {e}", self.path.display())))?;
        tracing::debug!(job = %attempt.posting.id, path = %self.path.display(), "outcome recorded");
        Ok(())
    }
}

// An empty file counts as terminated.
fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    pub records: Vec<OutcomeRecord>,
}

impl OutcomeRecorder for MemoryRecorder {
    fn record(&mut self, attempt: &ApplicationAttempt) -> Result<(), QuickApplyError> {
        self.records.push(OutcomeRecord::from_attempt(attempt));
        Ok(())
    }
}

impl<R: OutcomeRecorder + ?Sized> OutcomeRecorder for &mut R {
    fn record(&mut self, attempt: &ApplicationAttempt) -> Result<(), QuickApplyError> {
        (**self).record(attempt)
    }
}
