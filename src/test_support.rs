//! In-memory fixtures shared by unit tests across modules.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::{Bay, BayColumn, Cell, Level, Matrix, StackItem};
use crate::store::{MatrixStore, StoreError};

pub fn sample_item(pieces: u32) -> StackItem {
    let mut item = StackItem::new("45x90", 90, 45, 6000, pieces);
    item.grade = Some("LVL11".to_string());
    item
}

pub fn sample_cell(bay: Bay, level: Level, pieces: u32) -> Cell {
    Cell::new(
        bay,
        level,
        vec![sample_item(pieces)],
        "Tester",
        format!("2025-01-01T00:00:{:02}Z", level.index()),
    )
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    matrix: Mutex<Matrix>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn with_matrix(matrix: Matrix) -> Self {
        Self {
            matrix: Mutex::new(matrix),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Matrix {
        self.matrix
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk unavailable")));
        }
        Ok(())
    }
}

impl MatrixStore for MemoryStore {
    fn read_matrix(&self) -> Result<Matrix, StoreError> {
        self.check()?;
        Ok(self.snapshot())
    }

    fn write_bay(&self, column: &BayColumn) -> Result<(), StoreError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.matrix
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_column(column.clone());
        Ok(())
    }

    fn write_matrix(&self, matrix: &Matrix) -> Result<(), StoreError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.matrix.lock().unwrap_or_else(PoisonError::into_inner) = matrix.clone();
        Ok(())
    }
}
