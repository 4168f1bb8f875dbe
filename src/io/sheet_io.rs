use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::io::lock::{DEFAULT_LOCK_WAIT, LockError, SheetLock};
use crate::model::revision::{TaskRevision, TaskTable};
use crate::ops::revise::FieldMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid destination id '{0}': use letters, digits, '-' or '_'")]
    InvalidDestination(String),
    #[error("sheet '{id}' not found at {path}")]
    MissingSheet { id: String, path: PathBuf },
    #[error("sheet '{0}' has no header row")]
    NoHeaders(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Reads a whole sheet snapshot.
pub trait RowSource {
    fn fetch(&self, destination_id: &str) -> Result<TaskTable, StoreError>;

    /// The header row of a sheet
    fn headers(&self, destination_id: &str) -> Result<Vec<String>, StoreError>;
}

/// Appends one record to a sheet.
pub trait RowSink {
    /// Values are placed by header name; headers missing from `record` are
    /// written empty. Failures are logged and reported as `false`.
    fn append_record(&self, destination_id: &str, record: &FieldMap) -> bool;
}

/// Sheets stored as `<dir>/<destination_id>.csv`, header row first.
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    dir: PathBuf,
    lock_wait: Duration,
}

impl CsvSheetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSheetStore {
            dir: dir.into(),
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// How long writes wait for another writer to finish
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    fn lock(&self) -> Result<SheetLock, LockError> {
        SheetLock::acquire(&self.dir, self.lock_wait)
    }

    pub fn sheet_path(&self, destination_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !destination_id.is_empty()
            && destination_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidDestination(destination_id.to_string()));
        }
        Ok(self.dir.join(format!("{destination_id}.csv")))
    }

    pub fn exists(&self, destination_id: &str) -> bool {
        self.sheet_path(destination_id)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Replace a sheet's entire contents atomically.
    pub fn write_table(&self, destination_id: &str, table: &TaskTable) -> Result<(), StoreError> {
        let path = self.sheet_path(destination_id)?;
        fs::create_dir_all(&self.dir)?;
        let _lock = self.lock()?;
        write_csv(&path, table)?;
        tracing::info!(sheet = destination_id, rows = table.rows.len(), "sheet written");
        Ok(())
    }

    /// Read, transform and replace a sheet under one lock, so no append can
    /// land between the read and the write. The sheet is only rewritten when
    /// `transform` returns a different table.
    pub fn rewrite<R>(
        &self,
        destination_id: &str,
        transform: impl FnOnce(&TaskTable) -> (TaskTable, R),
    ) -> Result<R, StoreError> {
        let path = self.existing_sheet(destination_id)?;
        let _lock = self.lock()?;

        let current = read_csv(&path)?;
        let (next, out) = transform(&current);
        if next != current {
            write_csv(&path, &next)?;
            tracing::info!(sheet = destination_id, rows = next.rows.len(), "sheet rewritten");
        }
        Ok(out)
    }

    fn try_append(&self, destination_id: &str, record: &FieldMap) -> Result<(), StoreError> {
        let path = self.existing_sheet(destination_id)?;
        let _lock = self.lock()?;

        let headers = self.headers(destination_id)?;
        if headers.is_empty() {
            return Err(StoreError::NoHeaders(destination_id.to_string()));
        }
        for key in record.keys().filter(|k| !headers.contains(k)) {
            tracing::debug!(sheet = destination_id, column = %key, "no such column; value dropped");
        }
        let values: Vec<&str> = headers
            .iter()
            .map(|h| record.get(h).map(|v| v.as_str()).unwrap_or(""))
            .collect();

        let mut file = OpenOptions::new().read(true).append(true).open(&path)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&values)?;
        writer.flush()?;
        Ok(())
    }

    fn existing_sheet(&self, destination_id: &str) -> Result<PathBuf, StoreError> {
        let path = self.sheet_path(destination_id)?;
        if !path.is_file() {
            return Err(StoreError::MissingSheet {
                id: destination_id.to_string(),
                path,
            });
        }
        Ok(path)
    }
}

impl RowSource for CsvSheetStore {
    fn fetch(&self, destination_id: &str) -> Result<TaskTable, StoreError> {
        let table = read_csv(&self.existing_sheet(destination_id)?)?;
        tracing::debug!(sheet = destination_id, rows = table.rows.len(), "sheet fetched");
        Ok(table)
    }

    fn headers(&self, destination_id: &str) -> Result<Vec<String>, StoreError> {
        let path = self.existing_sheet(destination_id)?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        Ok(reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect())
    }
}

impl RowSink for CsvSheetStore {
    fn append_record(&self, destination_id: &str, record: &FieldMap) -> bool {
        match self.try_append(destination_id, record) {
            Ok(()) => {
                tracing::info!(sheet = destination_id, "record appended");
                true
            }
            Err(e) => {
                tracing::error!(sheet = destination_id, error = %e, "append failed");
                false
            }
        }
    }
}

/// Parse a whole sheet; fully blank rows are skipped.
fn read_csv(path: &Path) -> Result<TaskTable, StoreError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = TaskRevision::from_pairs(headers.iter().map(|h| h.as_str()).zip(record.iter()));
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(TaskTable::new(headers, rows))
}

/// Serialize `table` and swap it in. The caller holds the lock.
fn write_csv(path: &Path, table: &TaskTable) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.to_record(&table.headers))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    atomic_write(path, &data)?;
    Ok(())
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
