//! Shape normalizer for matrices arriving from anywhere: store files, wire
//! bodies, CLI input. The output always satisfies the matrix invariants:
//! every coordinate present, coordinate tags matching the slot, and cells
//! without items collapsed to empty slots. Never fails.

use serde_json::{Map, Number, Value};

use crate::domain::{Bay, BayColumn, Cell, Level, Matrix, StackItem};

pub fn normalize_matrix(value: &Value) -> Matrix {
    let mut matrix = Matrix::empty();
    let Some(bays) = value.as_object() else {
        return matrix;
    };
    for bay in Bay::ALL {
        if let Some(levels) = bays.get(bay.as_str()) {
            matrix.replace_column(normalize_bay_column(bay, levels));
        }
    }
    matrix
}

pub fn normalize_bay_column(bay: Bay, value: &Value) -> BayColumn {
    let mut column = BayColumn::empty(bay);
    let Some(levels) = value.as_object() else {
        return column;
    };
    for level in Level::ALL {
        if let Some(candidate) = levels.get(level.as_str()) {
            column.set(level, normalize_cell(bay, level, candidate));
        }
    }
    column
}

/// Non-objects and cells whose item list ends up empty become `None`.
pub fn normalize_cell(bay: Bay, level: Level, value: &Value) -> Option<Cell> {
    let object = value.as_object()?;
    let mut fields = Fields::new(object);
    fields.discard("bay");
    fields.discard("level");

    let items = fields
        .take("items")
        .map(|raw| normalize_items(&raw))
        .unwrap_or_default();
    if items.is_empty() {
        return None;
    }

    let id = fields.take_optional("id", coerce_id);
    let updated_by = fields.take_text("updated_by");
    let updated_at = fields.take_text("updated_at");
    let locked = fields.take_optional("locked", Value::as_bool);

    Some(Cell {
        bay,
        level,
        id,
        items,
        updated_by,
        updated_at,
        locked,
        extra: fields.into_rest(),
    })
}

/// Accepts any value; keeps only entries that are objects. A cell whose
/// entries are all non-objects therefore ends up empty.
pub fn normalize_items(value: &Value) -> Vec<StackItem> {
    match value.as_array() {
        Some(entries) => entries.iter().filter_map(normalize_item).collect(),
        None => Vec::new(),
    }
}

fn normalize_item(value: &Value) -> Option<StackItem> {
    let object = value.as_object()?;
    let mut fields = Fields::new(object);

    let size_id = fields.take_text("size_id");
    let width_mm = fields.take_count("width_mm");
    let thickness_mm = fields.take_count("thickness_mm");
    let length_mm = fields.take_count("length_mm");
    let grade = fields.take_optional("grade", coerce_string);
    let treatment = fields.take_optional("treatment", coerce_string);
    let pieces = fields.take_count("pieces");
    let bundle_id = fields.take_optional("bundle_id", coerce_id);
    let notes = fields.take_optional("notes", coerce_string);
    let position = fields.take_optional("position", coerce_i64);

    Some(StackItem {
        size_id,
        width_mm,
        thickness_mm,
        length_mm,
        grade,
        treatment,
        pieces,
        bundle_id,
        notes,
        position,
        extra: fields.into_rest(),
    })
}

/// Pulls known keys out of a cloned object; whatever remains is passed
/// through untouched.
struct Fields {
    rest: Map<String, Value>,
}

impl Fields {
    fn new(object: &Map<String, Value>) -> Self {
        Self {
            rest: object.clone(),
        }
    }

    fn discard(&mut self, key: &str) {
        self.rest.remove(key);
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.rest.remove(key)
    }

    /// Required text field: wrong types fall back to an empty string and
    /// the raw value stays in the passthrough map.
    fn take_text(&mut self, key: &str) -> String {
        self.take_required(key, coerce_id)
    }

    /// Required non-negative integer: unparseable values fall back to zero
    /// and the raw value stays in the passthrough map.
    fn take_count(&mut self, key: &str) -> u32 {
        self.take_required(key, coerce_count)
    }

    fn take_required<T: Default>(&mut self, key: &str, coerce: impl Fn(&Value) -> Option<T>) -> T {
        self.take_optional(key, coerce).unwrap_or_default()
    }

    /// Optional field: `null` clears it, a value of the wrong type stays in
    /// the passthrough map so nothing is lost.
    fn take_optional<T>(&mut self, key: &str, coerce: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let raw = self.take(key)?;
        if raw.is_null() {
            return None;
        }
        match coerce(&raw) {
            Some(value) => Some(value),
            None => {
                self.rest.insert(key.to_string(), raw);
                None
            }
        }
    }

    fn into_rest(self) -> Map<String, Value> {
        self.rest
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Negative counts clamp to zero; only non-numeric input is rejected.
fn coerce_count(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(number) => number_as_f64(number),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !parsed.is_finite() {
        return None;
    }
    Some(parsed.max(0.0).round().min(f64::from(u32::MAX)) as u32)
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|raw| raw.is_finite()).map(|raw| raw.round() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn number_as_f64(number: &Number) -> Option<f64> {
    number
        .as_u64()
        .map(|raw| raw as f64)
        .or_else(|| number.as_f64())
}
