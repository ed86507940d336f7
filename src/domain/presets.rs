use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizePreset {
    pub id: &'static str,
    pub width_mm: u32,
    pub thickness_mm: u32,
}

const fn size(id: &'static str, width_mm: u32, thickness_mm: u32) -> SizePreset {
    SizePreset {
        id,
        width_mm,
        thickness_mm,
    }
}

pub const SIZE_PRESETS: [SizePreset; 26] = [
    size("45x90", 90, 45),
    size("45x140", 140, 45),
    size("64x90", 90, 64),
    size("64x140", 140, 64),
    size("64x200", 200, 64),
    size("64x240", 240, 64),
    size("64x300", 300, 64),
    size("64x400", 400, 64),
    size("64x600", 600, 64),
    size("90x150", 150, 90),
    size("90x200", 200, 90),
    size("90x240", 240, 90),
    size("90x300", 300, 90),
    size("90x600", 600, 90),
    size("135x150", 150, 135),
    size("135x200", 200, 135),
    size("135x240", 240, 135),
    size("135x300", 300, 135),
    size("135x400", 400, 135),
    size("180x240", 240, 180),
    size("180x300", 300, 180),
    size("180x360", 360, 180),
    size("180x400", 400, 180),
    size("180x460", 460, 180),
    size("180x540", 540, 180),
    size("225x460", 460, 225),
];

pub const LENGTH_PRESETS_MM: [u32; 4] = [12000, 6000, 7000, 8900];

pub const GRADE_PRESETS: [&str; 4] = ["LVL11", "LVL11 visual", "LVL13", "LVL13 visual"];

pub const TREATMENT_PRESETS: [&str; 2] = ["H1.2", "H3.2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeDimensions {
    pub thickness_mm: u32,
    pub width_mm: u32,
}

/// Size ids read `<thickness>x<width>`, e.g. `45x90`.
pub fn size_dimensions(size_id: &str) -> Option<SizeDimensions> {
    let normalized = size_id.trim().to_ascii_lowercase();
    let (thickness, width) = normalized.split_once('x')?;
    let thickness_mm = thickness.trim().parse::<u32>().ok()?;
    let width_mm = width.trim().parse::<u32>().ok()?;
    if thickness_mm == 0 || width_mm == 0 {
        return None;
    }
    Some(SizeDimensions {
        thickness_mm,
        width_mm,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetCatalog {
    pub sizes: &'static [SizePreset],
    pub lengths_mm: &'static [u32],
    pub grades: &'static [&'static str],
    pub treatments: &'static [&'static str],
}

pub fn catalog() -> PresetCatalog {
    PresetCatalog {
        sizes: &SIZE_PRESETS,
        lengths_mm: &LENGTH_PRESETS_MM,
        grades: &GRADE_PRESETS,
        treatments: &TREATMENT_PRESETS,
    }
}
