use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::grid::{Bay, Level};

pub const UNKNOWN_ACTOR: &str = "Unknown user";

/// One timber bundle. Fields the tracker does not model, and raw values
/// that could not be coerced into a modelled field, are kept in `extra` so
/// they survive a round trip through the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StackItem {
    pub size_id: String,
    pub width_mm: u32,
    pub thickness_mm: u32,
    pub length_mm: u32,
    pub grade: Option<String>,
    pub treatment: Option<String>,
    pub pieces: u32,
    pub bundle_id: Option<String>,
    pub notes: Option<String>,
    pub position: Option<i64>,
    pub extra: Map<String, Value>,
}

impl StackItem {
    pub fn new(
        size_id: impl Into<String>,
        width_mm: u32,
        thickness_mm: u32,
        length_mm: u32,
        pieces: u32,
    ) -> Self {
        Self {
            size_id: size_id.into(),
            width_mm,
            thickness_mm,
            length_mm,
            grade: None,
            treatment: None,
            pieces,
            bundle_id: None,
            notes: None,
            position: None,
            extra: Map::new(),
        }
    }
}

/// Occupant of one (bay, level) coordinate. The first item is the
/// representative bundle used for summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub bay: Bay,
    pub level: Level,
    pub id: Option<String>,
    pub items: Vec<StackItem>,
    pub updated_by: String,
    pub updated_at: String,
    pub locked: Option<bool>,
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn new(
        bay: Bay,
        level: Level,
        items: Vec<StackItem>,
        updated_by: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        Self {
            bay,
            level,
            id: None,
            items,
            updated_by: updated_by.into(),
            updated_at: updated_at.into(),
            locked: None,
            extra: Map::new(),
        }
    }

    pub fn representative(&self) -> Option<&StackItem> {
        self.items.first()
    }

    pub fn total_pieces(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.pieces)).sum()
    }
}

impl Serialize for StackItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut fields = Passthrough::new(&mut map, &self.extra);
        fields.entry("size_id", &self.size_id)?;
        fields.entry("width_mm", &self.width_mm)?;
        fields.entry("thickness_mm", &self.thickness_mm)?;
        fields.entry("length_mm", &self.length_mm)?;
        fields.optional("grade", self.grade.as_ref())?;
        fields.optional("treatment", self.treatment.as_ref())?;
        fields.entry("pieces", &self.pieces)?;
        fields.optional("bundle_id", self.bundle_id.as_ref())?;
        fields.optional("notes", self.notes.as_ref())?;
        fields.optional("position", self.position.as_ref())?;
        fields.finish()?;
        map.end()
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut fields = Passthrough::new(&mut map, &self.extra);
        fields.entry("bay", &self.bay)?;
        fields.entry("level", &self.level)?;
        fields.optional("id", self.id.as_ref())?;
        fields.entry("items", &self.items)?;
        fields.entry("updated_by", &self.updated_by)?;
        fields.entry("updated_at", &self.updated_at)?;
        fields.optional("locked", self.locked.as_ref())?;
        fields.finish()?;
        map.end()
    }
}

/// Writes modelled fields followed by the passthrough map. A passthrough
/// key shadows the modelled field of the same name, which then only holds
/// the fallback for a value that could not be coerced.
struct Passthrough<'a, M> {
    map: &'a mut M,
    extra: &'a Map<String, Value>,
}

impl<'a, M: SerializeMap> Passthrough<'a, M> {
    fn new(map: &'a mut M, extra: &'a Map<String, Value>) -> Self {
        Self { map, extra }
    }

    fn entry<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), M::Error> {
        if self.extra.contains_key(key) {
            return Ok(());
        }
        self.map.serialize_entry(key, value)
    }

    fn optional<T: Serialize>(&mut self, key: &str, value: Option<&T>) -> Result<(), M::Error> {
        match value {
            Some(value) => self.entry(key, value),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<(), M::Error> {
        for (key, value) in self.extra {
            self.map.serialize_entry(key, value)?;
        }
        Ok(())
    }
}

/// Who is editing. Rendered into `Cell::updated_by`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub name: Option<String>,
    pub title: Option<String>,
}

impl Actor {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, title: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            title,
        }
    }

    pub fn label(&self) -> String {
        let name = self.name.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let title = self.title.as_deref().map(str::trim).filter(|v| !v.is_empty());
        match (name, title) {
            (Some(name), Some(title)) => format!("{name} ({title})"),
            (Some(name), None) => name.to_string(),
            (None, _) => UNKNOWN_ACTOR.to_string(),
        }
    }
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[cfg(test)]
mod tests {
    use super::{now_utc_rfc3339, Actor, Cell, StackItem, UNKNOWN_ACTOR};
    use crate::domain::grid::{Bay, Level};
    use serde_json::json;
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    #[test]
    fn actor_label_matches_name_and_title_format() {
        let actor = Actor::new("Steve", Some("Factory Manager".to_string()));
        assert_eq!(actor.label(), "Steve (Factory Manager)");
        assert_eq!(Actor::new("Angel", None).label(), "Angel");
        assert_eq!(Actor::new("Angel", Some("  ".to_string())).label(), "Angel");
        assert_eq!(Actor::default().label(), UNKNOWN_ACTOR);
    }

    #[test]
    fn serializes_with_optional_fields_omitted() {
        let cell = Cell::new(
            Bay::B02,
            Level::L03,
            vec![StackItem::new("45x90", 90, 45, 6000, 12)],
            "Steve",
            "2025-01-01T00:00:00Z",
        );
        let value = serde_json::to_value(&cell).expect("cell should serialize");
        assert_eq!(
            value,
            json!({
                "bay": "B02",
                "level": "L03",
                "items": [{
                    "size_id": "45x90",
                    "width_mm": 90,
                    "thickness_mm": 45,
                    "length_mm": 6000,
                    "pieces": 12
                }],
                "updated_by": "Steve",
                "updated_at": "2025-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn extra_fields_are_flattened() {
        let mut cell = Cell::new(Bay::B01, Level::L01, Vec::new(), "a", "t");
        cell.extra.insert("area_id".to_string(), json!("default"));
        cell.locked = Some(true);
        let value = serde_json::to_value(&cell).expect("cell should serialize");
        assert_eq!(value["area_id"], json!("default"));
        assert_eq!(value["locked"], json!(true));
    }

    #[test]
    fn representative_is_first_item_and_pieces_sum() {
        let cell = Cell::new(
            Bay::B01,
            Level::L01,
            vec![
                StackItem::new("64x200", 200, 64, 12000, 3),
                StackItem::new("45x90", 90, 45, 6000, 7),
            ],
            "a",
            "t",
        );
        assert_eq!(
            cell.representative().map(|item| item.size_id.as_str()),
            Some("64x200")
        );
        assert_eq!(cell.total_pieces(), 10);
    }

    #[test]
    fn timestamps_parse_back_as_rfc3339() {
        let stamp = now_utc_rfc3339();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }

    #[test]
    fn passthrough_value_shadows_the_coerced_fallback() {
        let mut item = StackItem::new("45x90", 0, 45, 6000, 2);
        item.extra.insert("width_mm".to_string(), json!("n/a"));
        item.extra.insert("grade".to_string(), json!(11));
        let mut cell = Cell::new(Bay::B01, Level::L01, vec![item], "", "t");
        cell.extra.insert("updated_by".to_string(), json!({ "pin": 4 }));

        let text = serde_json::to_string(&cell).expect("cell should serialize");
        assert_eq!(text.matches("\"width_mm\"").count(), 1);
        assert_eq!(text.matches("\"updated_by\"").count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).expect("output is JSON");
        assert_eq!(value["items"][0]["width_mm"], json!("n/a"));
        assert_eq!(value["items"][0]["grade"], json!(11));
        assert_eq!(value["updated_by"], json!({ "pin": 4 }));
    }
}
