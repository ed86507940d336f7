use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::cell::Cell;
use super::grid::{Bay, Level};

/// The ten levels of one bay. Every level is always present; `None` is an
/// empty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BayColumn {
    bay: Bay,
    cells: [Option<Cell>; Level::COUNT],
}

impl BayColumn {
    pub fn empty(bay: Bay) -> Self {
        Self {
            bay,
            cells: std::array::from_fn(|_| None),
        }
    }

    pub fn bay(&self) -> Bay {
        self.bay
    }

    pub fn get(&self, level: Level) -> Option<&Cell> {
        self.cells[level.index()].as_ref()
    }

    /// Places `cell` at `level`, rewriting its coordinate tags to match.
    pub fn set(&mut self, level: Level, cell: Option<Cell>) {
        self.cells[level.index()] = cell.map(|mut cell| {
            cell.bay = self.bay;
            cell.level = level;
            cell
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (Level, Option<&Cell>)> + '_ {
        Level::ALL
            .into_iter()
            .map(move |level| (level, self.cells[level.index()].as_ref()))
    }

    /// Occupied cells, bottom to top.
    pub fn occupied(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter_map(Option::as_ref)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }
}

impl Serialize for BayColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Level::COUNT))?;
        for (level, cell) in self.iter() {
            map.serialize_entry(level.as_str(), &cell)?;
        }
        map.end()
    }
}

/// The full 13 x 10 grid. Structurally complete by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    columns: [BayColumn; Bay::COUNT],
}

impl Matrix {
    pub fn empty() -> Self {
        Self {
            columns: std::array::from_fn(|index| BayColumn::empty(Bay::ALL[index])),
        }
    }

    pub fn column(&self, bay: Bay) -> &BayColumn {
        &self.columns[bay.index()]
    }

    pub fn columns(&self) -> impl Iterator<Item = &BayColumn> + '_ {
        self.columns.iter()
    }

    /// Swaps in a whole column. The column's own bay decides where it lands.
    pub fn replace_column(&mut self, column: BayColumn) {
        let index = column.bay().index();
        self.columns[index] = column;
    }

    pub fn cell(&self, bay: Bay, level: Level) -> Option<&Cell> {
        self.column(bay).get(level)
    }

    pub fn set_cell(&mut self, bay: Bay, level: Level, cell: Option<Cell>) {
        self.columns[bay.index()].set(level, cell);
    }

    pub fn occupied_count(&self) -> usize {
        self.columns.iter().map(BayColumn::occupied_count).sum()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Bay::COUNT))?;
        for column in &self.columns {
            map.serialize_entry(column.bay().as_str(), column)?;
        }
        map.end()
    }
}
