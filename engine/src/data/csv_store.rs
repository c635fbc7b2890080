// Append-only analysis store backed by a CSV file
use crate::error::{EngineError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use shared::models::AnalysisRecord;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage collaborator for analysis records. Rows are only ever appended.
pub trait AnalysisSink: Send + Sync {
    fn append(&self, records: &[AnalysisRecord]) -> Result<()>;
}

pub struct CsvAnalysisStore {
    path: PathBuf,
    // Serializes appends so rows from concurrent symbols never interleave.
    write_lock: Mutex<()>,
}

impl CsvAnalysisStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvAnalysisStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<AnalysisRecord>> {
        let file = File::open(path.as_ref())?;
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(BufReader::new(file));
        let mut records = Vec::new();
        for (idx, result) in rdr.deserialize().enumerate() {
            let record: AnalysisRecord = result.map_err(|e| {
                EngineError::StorageError(format!("Error reading analysis record at line {}: {}", idx + 2, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl AnalysisSink for CsvAnalysisStore {
    fn append(&self, records: &[AnalysisRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::StorageError("analysis store lock poisoned".to_string()))?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let write_header = file.metadata()?.len() == 0;
        let mut writer = WriterBuilder::new().has_headers(write_header).from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "Appended analysis records");
        Ok(())
    }
}
