use serde::Serialize;

use super::cell::{Cell, StackItem};
use super::grid::{Bay, Level};
use super::matrix::{BayColumn, Matrix};

pub fn linear_meters(item: &StackItem) -> f64 {
    f64::from(item.pieces) * f64::from(item.length_mm) / 1000.0
}

pub fn cubic_meters(item: &StackItem) -> f64 {
    f64::from(item.width_mm)
        * f64::from(item.thickness_mm)
        * f64::from(item.length_mm)
        * f64::from(item.pieces)
        / 1e9
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub pieces: u64,
    pub linear_m: f64,
    pub cubic_m: f64,
}

impl Totals {
    fn add_item(&mut self, item: &StackItem) {
        self.pieces += u64::from(item.pieces);
        self.linear_m += linear_meters(item);
        self.cubic_m += cubic_meters(item);
    }

    fn add(&mut self, other: &Totals) {
        self.pieces += other.pieces;
        self.linear_m += other.linear_m;
        self.cubic_m += other.cubic_m;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSummary {
    pub bay: Bay,
    pub level: Level,
    pub representative: Option<String>,
    pub item_count: usize,
    pub totals: Totals,
}

impl CellSummary {
    pub fn of(cell: &Cell) -> Self {
        let mut totals = Totals::default();
        for item in &cell.items {
            totals.add_item(item);
        }
        Self {
            bay: cell.bay,
            level: cell.level,
            representative: cell.representative().map(|item| item.size_id.clone()),
            item_count: cell.items.len(),
            totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaySummary {
    pub bay: Bay,
    pub occupied_levels: usize,
    pub totals: Totals,
    pub cells: Vec<CellSummary>,
}

impl BaySummary {
    pub fn of(column: &BayColumn) -> Self {
        let cells = column.occupied().map(CellSummary::of).collect::<Vec<_>>();
        let mut totals = Totals::default();
        for cell in &cells {
            totals.add(&cell.totals);
        }
        Self {
            bay: column.bay(),
            occupied_levels: cells.len(),
            totals,
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixSummary {
    pub occupied_cells: usize,
    pub totals: Totals,
    pub bays: Vec<BaySummary>,
}

impl MatrixSummary {
    pub fn of(matrix: &Matrix) -> Self {
        let bays = matrix.columns().map(BaySummary::of).collect::<Vec<_>>();
        let mut totals = Totals::default();
        for bay in &bays {
            totals.add(&bay.totals);
        }
        Self {
            occupied_cells: bays.iter().map(|bay| bay.occupied_levels).sum(),
            totals,
            bays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cubic_meters, linear_meters, MatrixSummary};
    use crate::domain::cell::{Cell, StackItem};
    use crate::domain::grid::{Bay, Level};
    use crate::domain::matrix::Matrix;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn item_measures_follow_mm_conversions() {
        let item = StackItem::new("45x90", 90, 45, 12000, 4);
        assert!(approx(linear_meters(&item), 48.0));
        assert!(approx(cubic_meters(&item), 0.1944));
    }

    #[test]
    fn matrix_summary_rolls_up_cells_and_bays() {
        let mut matrix = Matrix::empty();
        matrix.set_cell(
            Bay::B01,
            Level::L01,
            Some(Cell::new(
                Bay::B01,
                Level::L01,
                vec![
                    StackItem::new("45x90", 90, 45, 12000, 4),
                    StackItem::new("45x90", 90, 45, 6000, 2),
                ],
                "a",
                "t1",
            )),
        );
        matrix.set_cell(
            Bay::B03,
            Level::L02,
            Some(Cell::new(
                Bay::B03,
                Level::L02,
                vec![StackItem::new("64x200", 200, 64, 8900, 1)],
                "a",
                "t2",
            )),
        );

        let summary = MatrixSummary::of(&matrix);
        assert_eq!(summary.occupied_cells, 2);
        assert_eq!(summary.totals.pieces, 7);
        assert!(approx(summary.totals.linear_m, 48.0 + 12.0 + 8.9));

        let bay_one = &summary.bays[0];
        assert_eq!(bay_one.occupied_levels, 1);
        assert_eq!(bay_one.cells[0].representative.as_deref(), Some("45x90"));
        assert_eq!(bay_one.cells[0].item_count, 2);
        assert!(summary.bays[1].cells.is_empty());
    }
}
