use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Transaction};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{MatrixStore, StoreError};
use crate::domain::{now_utc_rfc3339, Bay, BayColumn, Cell, Level, Matrix, StackItem};
use crate::normalize::normalize_cell;

pub const CURRENT_SCHEMA_VERSION: i64 = 3;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        name: "baseline_stock_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stock_cells (
    id TEXT PRIMARY KEY,
    area_id TEXT NOT NULL,
    bay_code TEXT NOT NULL,
    level_code TEXT NOT NULL,
    locked INTEGER,
    updated_by TEXT,
    updated_at TEXT NOT NULL,
    UNIQUE (area_id, bay_code, level_code)
);

CREATE TABLE IF NOT EXISTS stock_items (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    cell_id TEXT NOT NULL REFERENCES stock_cells(id) ON DELETE CASCADE,
    item_order INTEGER NOT NULL,
    size_id TEXT NOT NULL,
    width_mm INTEGER NOT NULL,
    thickness_mm INTEGER NOT NULL,
    length_mm INTEGER NOT NULL,
    grade TEXT,
    treatment TEXT,
    pieces INTEGER NOT NULL,
    bundle_id TEXT,
    notes TEXT,
    position INTEGER
);

CREATE INDEX IF NOT EXISTS idx_stock_cells_area_bay ON stock_cells(area_id, bay_code);
CREATE INDEX IF NOT EXISTS idx_stock_items_cell ON stock_items(cell_id, item_order);
"#,
    },
    Migration {
        version: 2,
        name: "passthrough_fields_v1",
        sql: r#"
ALTER TABLE stock_cells ADD COLUMN extra_json TEXT;
ALTER TABLE stock_items ADD COLUMN extra_json TEXT;
"#,
    },
    Migration {
        version: 3,
        name: "cell_row_keys_v1",
        sql: r#"
CREATE TABLE stock_cells_next (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    area_id TEXT NOT NULL,
    bay_code TEXT NOT NULL,
    level_code TEXT NOT NULL,
    locked INTEGER,
    updated_by TEXT,
    updated_at TEXT NOT NULL,
    extra_json TEXT,
    UNIQUE (area_id, bay_code, level_code)
);

INSERT INTO stock_cells_next (
    id, area_id, bay_code, level_code, locked, updated_by, updated_at, extra_json
)
SELECT id, area_id, bay_code, level_code, locked, updated_by, updated_at, extra_json
FROM stock_cells;

CREATE TABLE stock_items_next (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    cell_row INTEGER NOT NULL REFERENCES stock_cells_next(row_id) ON DELETE CASCADE,
    item_order INTEGER NOT NULL,
    size_id TEXT NOT NULL,
    width_mm INTEGER NOT NULL,
    thickness_mm INTEGER NOT NULL,
    length_mm INTEGER NOT NULL,
    grade TEXT,
    treatment TEXT,
    pieces INTEGER NOT NULL,
    bundle_id TEXT,
    notes TEXT,
    position INTEGER,
    extra_json TEXT
);

INSERT INTO stock_items_next (
    cell_row, item_order, size_id, width_mm, thickness_mm, length_mm, grade,
    treatment, pieces, bundle_id, notes, position, extra_json
)
SELECT c.row_id, i.item_order, i.size_id, i.width_mm, i.thickness_mm, i.length_mm,
       i.grade, i.treatment, i.pieces, i.bundle_id, i.notes, i.position, i.extra_json
FROM stock_items i
JOIN stock_cells_next c ON c.id = i.cell_id;

DROP TABLE stock_items;
DROP TABLE stock_cells;
ALTER TABLE stock_cells_next RENAME TO stock_cells;
ALTER TABLE stock_items_next RENAME TO stock_items;

CREATE INDEX IF NOT EXISTS idx_stock_cells_area_bay ON stock_cells(area_id, bay_code);
CREATE INDEX IF NOT EXISTS idx_stock_items_cell ON stock_items(cell_row, item_order);
"#,
    },
];

/// Two-table layout: one row per occupied cell, one row per bundle. Cell
/// rows are keyed by a surrogate `row_id`; the public `id` is plain data,
/// so repeated ids across slots or areas are stored as given.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    area_id: String,
}

impl SqliteStore {
    pub fn open(path: &Path, area_id: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        configure_connection(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            area_id: area_id.to_string(),
        })
    }

    #[cfg(test)]
    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    #[cfg(test)]
    pub fn schema_version(&self) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|value| value.parse().ok()))
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

struct CellRow {
    row_id: i64,
    id: String,
    bay_code: String,
    level_code: String,
    locked: Option<bool>,
    updated_by: Option<String>,
    updated_at: String,
    extra_json: Option<String>,
}

impl MatrixStore for SqliteStore {
    fn read_matrix(&self) -> Result<Matrix, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let cells = {
            let mut stmt = conn.prepare(
                r#"
SELECT row_id, id, bay_code, level_code, locked, updated_by, updated_at, extra_json
FROM stock_cells
WHERE area_id = ?1
ORDER BY bay_code, level_code
"#,
            )?;
            let mut rows = stmt.query(params![self.area_id])?;
            let mut cells = Vec::new();
            while let Some(row) = rows.next()? {
                cells.push(CellRow {
                    row_id: row.get(0)?,
                    id: row.get(1)?,
                    bay_code: row.get(2)?,
                    level_code: row.get(3)?,
                    locked: row.get(4)?,
                    updated_by: row.get(5)?,
                    updated_at: row.get(6)?,
                    extra_json: row.get(7)?,
                });
            }
            cells
        };

        let mut matrix = Matrix::empty();
        for row in cells {
            let (Some(bay), Some(level)) = (Bay::from_code(&row.bay_code), Level::from_code(&row.level_code))
            else {
                continue;
            };
            let items = load_items(&conn, row.row_id)?;
            let mut object = parse_extra(row.extra_json.as_deref());
            column_value(&mut object, "id", json!(row.id));
            column_value(&mut object, "locked", json!(row.locked));
            column_value(&mut object, "updated_by", json!(row.updated_by));
            column_value(&mut object, "updated_at", json!(row.updated_at));
            object.insert("items".to_string(), Value::Array(items));
            matrix.set_cell(bay, level, normalize_cell(bay, level, &Value::Object(object)));
        }
        Ok(matrix)
    }

    fn write_bay(&self, column: &BayColumn) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM stock_cells WHERE area_id = ?1 AND bay_code = ?2",
            params![self.area_id, column.bay().as_str()],
        )?;
        for cell in column.occupied() {
            insert_cell(&tx, &self.area_id, cell)?;
        }
        tx.commit()?;
        tracing::debug!(
            area = %self.area_id,
            bay = %column.bay(),
            occupied = column.occupied_count(),
            "bay rows replaced"
        );
        Ok(())
    }

    fn write_matrix(&self, matrix: &Matrix) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM stock_cells WHERE area_id = ?1",
            params![self.area_id],
        )?;
        for column in matrix.columns() {
            for cell in column.occupied() {
                insert_cell(&tx, &self.area_id, cell)?;
            }
        }
        tx.commit()?;
        tracing::debug!(
            area = %self.area_id,
            occupied = matrix.occupied_count(),
            "matrix rows replaced"
        );
        Ok(())
    }
}

fn load_items(conn: &Connection, cell_row: i64) -> Result<Vec<Value>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
SELECT size_id, width_mm, thickness_mm, length_mm, grade, treatment, pieces,
       bundle_id, notes, position, extra_json
FROM stock_items
WHERE cell_row = ?1
ORDER BY item_order, row_id
"#,
    )?;
    let mut rows = stmt.query(params![cell_row])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let extra: Option<String> = row.get(10)?;
        let mut object = parse_extra(extra.as_deref());
        column_value(&mut object, "size_id", json!(row.get::<_, String>(0)?));
        column_value(&mut object, "width_mm", json!(row.get::<_, i64>(1)?));
        column_value(&mut object, "thickness_mm", json!(row.get::<_, i64>(2)?));
        column_value(&mut object, "length_mm", json!(row.get::<_, i64>(3)?));
        column_value(&mut object, "grade", json!(row.get::<_, Option<String>>(4)?));
        column_value(&mut object, "treatment", json!(row.get::<_, Option<String>>(5)?));
        column_value(&mut object, "pieces", json!(row.get::<_, i64>(6)?));
        column_value(&mut object, "bundle_id", json!(row.get::<_, Option<String>>(7)?));
        column_value(&mut object, "notes", json!(row.get::<_, Option<String>>(8)?));
        column_value(&mut object, "position", json!(row.get::<_, Option<i64>>(9)?));
        items.push(Value::Object(object));
    }
    Ok(items)
}

fn insert_cell(tx: &Transaction<'_>, area_id: &str, cell: &Cell) -> Result<(), StoreError> {
    let cell_id = cell
        .id
        .clone()
        .unwrap_or_else(|| format!("C-{}", Uuid::now_v7()));
    let updated_at = if cell.updated_at.trim().is_empty() {
        now_utc_rfc3339()
    } else {
        cell.updated_at.clone()
    };
    tx.execute(
        r#"
INSERT INTO stock_cells (
    id, area_id, bay_code, level_code, locked, updated_by, updated_at, extra_json
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#,
        params![
            cell_id,
            area_id,
            cell.bay.as_str(),
            cell.level.as_str(),
            cell.locked,
            cell.updated_by,
            updated_at,
            encode_extra(&cell.extra)?
        ],
    )?;

    let cell_row = tx.last_insert_rowid();
    for (order, item) in cell.items.iter().enumerate() {
        insert_item(tx, cell_row, order, item)?;
    }
    Ok(())
}

fn insert_item(
    tx: &Transaction<'_>,
    cell_row: i64,
    order: usize,
    item: &StackItem,
) -> Result<(), StoreError> {
    tx.execute(
        r#"
INSERT INTO stock_items (
    cell_row, item_order, size_id, width_mm, thickness_mm, length_mm, grade,
    treatment, pieces, bundle_id, notes, position, extra_json
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#,
        params![
            cell_row,
            order as i64,
            item.size_id,
            item.width_mm,
            item.thickness_mm,
            item.length_mm,
            item.grade,
            item.treatment,
            item.pieces,
            item.bundle_id,
            item.notes,
            item.position,
            encode_extra(&item.extra)?
        ],
    )?;
    Ok(())
}

fn encode_extra(extra: &Map<String, Value>) -> Result<Option<String>, StoreError> {
    if extra.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(extra)?))
}

/// A passthrough value of the same name wins: it is the raw input the
/// column only holds a fallback for.
fn column_value(object: &mut Map<String, Value>, key: &str, value: Value) {
    object.entry(key).or_insert(value);
}

fn parse_extra(raw: Option<&str>) -> Map<String, Value> {
    raw.and_then(|text| serde_json::from_str::<Map<String, Value>>(text).ok())
        .unwrap_or_default()
}
