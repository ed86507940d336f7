use std::io::{self, IsTerminal};

use crate::domain::measure::{MatrixSummary, Totals};
use crate::domain::presets::PresetCatalog;
use crate::domain::{Bay, BayColumn, Cell, Level, Matrix, StackItem};
use crate::reorder::cell_identity;

const GRID_COLUMN_WIDTH: usize = 11;

pub fn print_grid(matrix: &Matrix) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Stock matrix"));
    for line in grid_lines(matrix, &palette) {
        println!("{line}");
    }
    println!(
        "{}",
        palette.dim(&format!(
            "{} of {} cells occupied",
            matrix.occupied_count(),
            Bay::COUNT * Level::COUNT
        ))
    );
}

/// Top level first, like looking at the rack.
fn grid_lines(matrix: &Matrix, palette: &Palette) -> Vec<String> {
    let mut lines = Vec::with_capacity(Level::COUNT + 1);
    let mut header = " ".repeat(4);
    for bay in Bay::ALL {
        header.push_str(&palette.id(&pad(bay.as_str())));
    }
    lines.push(header.trim_end().to_string());

    for level in Level::ALL.iter().rev() {
        let mut line = format!("{} ", palette.dim(level.as_str()));
        for column in matrix.columns() {
            let label = match column.get(*level) {
                Some(cell) => palette.cell(&pad(&cell_label(cell))),
                None => palette.dim(&pad("·")),
            };
            line.push_str(&label);
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

fn pad(text: &str) -> String {
    let clipped = text.chars().take(GRID_COLUMN_WIDTH - 1).collect::<String>();
    format!("{clipped:<width$}", width = GRID_COLUMN_WIDTH)
}

fn cell_label(cell: &Cell) -> String {
    match cell.representative() {
        Some(item) if cell.items.len() > 1 => {
            format!("{}+{}", item.size_id, cell.items.len() - 1)
        }
        Some(item) => format!("{}/{}", item.size_id, item.pieces),
        None => "?".to_string(),
    }
}

pub fn print_bay(column: &BayColumn) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Bay {}", column.bay())));
    if column.is_empty() {
        println!("{}", palette.dim("empty"));
        return;
    }
    for (level, cell) in column.iter().collect::<Vec<_>>().into_iter().rev() {
        match cell {
            Some(cell) => {
                println!(
                    "{} {} {}",
                    palette.id(level.as_str()),
                    palette.dim(&cell_identity(cell)),
                    palette.dim(&cell.updated_by)
                );
                for item in &cell.items {
                    println!("    {}", item_line(item));
                }
            }
            None => println!("{} {}", palette.dim(level.as_str()), palette.dim("·")),
        }
    }
}

pub fn print_cell(cell: &Cell) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.heading(&format!("{} {}", cell.bay, cell.level)),
        palette.dim(&cell_identity(cell))
    );
    if let Some(id) = cell.id.as_deref() {
        println!("id:         {id}");
    }
    println!("updated by: {}", cell.updated_by);
    println!("updated at: {}", cell.updated_at);
    if cell.locked == Some(true) {
        println!("{}", palette.warn("locked"));
    }
    for item in &cell.items {
        println!("  {}", item_line(item));
    }
    if cell.items.len() > 1 {
        println!("{}", palette.dim(&format!("total: {} pcs", cell.total_pieces())));
    }
}

fn item_line(item: &StackItem) -> String {
    let mut line = format!(
        "{} x {} mm, {} pcs",
        item.size_id, item.length_mm, item.pieces
    );
    let extras = [
        item.grade.as_deref(),
        item.treatment.as_deref(),
        item.bundle_id.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    if !extras.is_empty() {
        line.push_str(&format!(" [{}]", extras.join(", ")));
    }
    if let Some(notes) = item.notes.as_deref() {
        line.push_str(&format!(" ({notes})"));
    }
    line
}

pub fn print_summary(summary: &MatrixSummary) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Stock summary"));
    for bay in summary.bays.iter().filter(|bay| bay.occupied_levels > 0) {
        println!(
            "{} {:>2} levels  {}",
            palette.id(bay.bay.as_str()),
            bay.occupied_levels,
            totals_line(&bay.totals)
        );
    }
    println!(
        "{}",
        palette.heading(&format!(
            "total {:>2} cells  {}",
            summary.occupied_cells,
            totals_line(&summary.totals)
        ))
    );
}

fn totals_line(totals: &Totals) -> String {
    format!(
        "{:>6} pcs {:>10.1} lm {:>8.3} m3",
        totals.pieces, totals.linear_m, totals.cubic_m
    )
}

pub fn print_presets(catalog: &PresetCatalog) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Sizes"));
    let sizes = catalog
        .sizes
        .iter()
        .map(|size| size.id)
        .collect::<Vec<_>>();
    for row in sizes.chunks(8) {
        println!("  {}", row.join("  "));
    }
    println!("{}", palette.heading("Lengths (mm)"));
    let lengths = catalog
        .lengths_mm
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>();
    println!("  {}", lengths.join("  "));
    println!("{}", palette.heading("Grades"));
    println!("  {}", catalog.grades.join(", "));
    println!("{}", palette.heading("Treatments"));
    println!("  {}", catalog.treatments.join(", "));
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn cell(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("33", text)
    }
}
