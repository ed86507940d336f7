use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use super::{MatrixStore, StoreError};
use crate::domain::{BayColumn, Matrix};
use crate::locks::{WriterLock, DEFAULT_LOCK_TIMEOUT};
use crate::normalize::normalize_matrix;

/// The whole matrix as one pretty-printed JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_timeout: Duration,
    writers: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            writers: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<Matrix>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let raw: Value = serde_json::from_slice(&bytes)?;
                Ok(Some(normalize_matrix(&raw)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn persist(&self, matrix: &Matrix) -> Result<(), StoreError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent)?;

        let staging = parent.join(format!(
            ".{}.{}.tmp",
            self.path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("matrix"),
            Uuid::now_v7().simple()
        ));
        std::fs::write(&staging, serde_json::to_vec_pretty(matrix)?)?;
        if let Err(err) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(StoreError::Io(err));
        }
        tracing::debug!(
            path = %self.path.display(),
            occupied = matrix.occupied_count(),
            "matrix document written"
        );
        Ok(())
    }

    fn rewrite(&self, apply: impl FnOnce(&mut Matrix)) -> Result<(), StoreError> {
        let _guard = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = WriterLock::acquire(&WriterLock::lock_path_for(&self.path), self.lock_timeout)?;
        let mut matrix = self.load()?.unwrap_or_default();
        apply(&mut matrix);
        self.persist(&matrix)
    }
}

impl MatrixStore for JsonFileStore {
    fn read_matrix(&self) -> Result<Matrix, StoreError> {
        if let Some(matrix) = self.load()? {
            return Ok(matrix);
        }
        // First read seeds an empty document so later reads are plain loads.
        let _guard = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = WriterLock::acquire(&WriterLock::lock_path_for(&self.path), self.lock_timeout)?;
        match self.load()? {
            Some(matrix) => Ok(matrix),
            None => {
                let matrix = Matrix::empty();
                self.persist(&matrix)?;
                Ok(matrix)
            }
        }
    }

    fn write_bay(&self, column: &BayColumn) -> Result<(), StoreError> {
        self.rewrite(|matrix| matrix.replace_column(column.clone()))
    }

    fn write_matrix(&self, matrix: &Matrix) -> Result<(), StoreError> {
        self.rewrite(|current| *current = matrix.clone())
    }
}
