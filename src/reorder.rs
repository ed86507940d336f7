use std::collections::HashMap;

use crate::domain::{Bay, BayColumn, Cell, Level};

pub const CELL_ID_SEPARATOR: &str = "::";

/// Opaque identity the caller captures before asking for a reorder.
pub fn cell_identity(cell: &Cell) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        cell.bay,
        cell.level,
        cell.updated_at,
        sep = CELL_ID_SEPARATOR
    )
}

/// Rearranges the occupied cells of `column` bottom-to-top in the order of
/// `ordered_ids`. Unknown identities are ignored; occupied cells the list
/// does not mention keep their relative order and go on top, so a stale
/// list can never drop a cell.
pub fn reorder_column<S: AsRef<str>>(column: &BayColumn, ordered_ids: &[S]) -> BayColumn {
    let mut remaining = column.occupied().cloned().map(Some).collect::<Vec<_>>();
    let mut by_identity = remaining
        .iter()
        .enumerate()
        .filter_map(|(slot, cell)| cell.as_ref().map(|cell| (cell_identity(cell), slot)))
        .collect::<HashMap<_, _>>();

    let mut ordered = Vec::with_capacity(remaining.len());
    for id in ordered_ids {
        let Some(slot) = by_identity.remove(id.as_ref()) else {
            continue;
        };
        if let Some(cell) = remaining[slot].take() {
            ordered.push(cell);
        }
    }
    ordered.extend(remaining.into_iter().flatten());

    restack(column.bay(), ordered)
}

/// Moves the cell at `level` above every other occupied cell, compacting
/// the bay from `L01` upward. A missing cell just compacts.
pub fn move_to_top(column: &BayColumn, level: Level) -> BayColumn {
    let (mut others, target): (Vec<Cell>, Vec<Cell>) = column
        .occupied()
        .cloned()
        .partition(|cell| cell.level != level);
    others.extend(target);
    restack(column.bay(), others)
}

/// Assigns `cells` to `L01, L02, ...` by position and re-tags their level.
/// Slots past the end stay empty.
pub fn restack(bay: Bay, cells: Vec<Cell>) -> BayColumn {
    let mut column = BayColumn::empty(bay);
    for (level, cell) in Level::ALL.into_iter().zip(cells) {
        column.set(level, Some(cell));
    }
    column
}

#[cfg(test)]
mod tests {
    use super::{cell_identity, move_to_top, reorder_column, restack};
    use crate::domain::{Bay, BayColumn, Cell, Level, StackItem};
    use pretty_assertions::assert_eq;

    fn cell(level: Level, size_id: &str, bundle: &str) -> Cell {
        let mut item = StackItem::new(size_id, 90, 45, 12000, 4);
        item.bundle_id = Some(bundle.to_string());
        Cell::new(
            Bay::B02,
            level,
            vec![item],
            "Lucio (CNC Operator)",
            format!("2025-04-0{}T08:00:00Z", level.index() + 1),
        )
    }

    fn column_of(levels: &[Level]) -> BayColumn {
        let mut column = BayColumn::empty(Bay::B02);
        for (index, level) in levels.iter().enumerate() {
            column.set(*level, Some(cell(*level, "45x90", &format!("BN-{index}"))));
        }
        column
    }

    fn bundles(column: &BayColumn) -> Vec<(Level, String)> {
        column
            .occupied()
            .map(|cell| {
                (
                    cell.level,
                    cell.items[0].bundle_id.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    #[test]
    fn identity_joins_bay_level_and_timestamp() {
        let cell = cell(Level::L03, "45x90", "BN");
        assert_eq!(cell_identity(&cell), "B02::L03::2025-04-03T08:00:00Z");
    }

    #[test]
    fn explicit_permutation_rewrites_levels_only() {
        let column = column_of(&[Level::L01, Level::L02, Level::L03]);
        let ids = column.occupied().map(cell_identity).collect::<Vec<_>>();
        let reordered = reorder_column(&column, &[&ids[2], &ids[0], &ids[1]]);

        assert_eq!(
            bundles(&reordered),
            vec![
                (Level::L01, "BN-2".to_string()),
                (Level::L02, "BN-0".to_string()),
                (Level::L03, "BN-1".to_string()),
            ]
        );
        let moved = reordered.get(Level::L01).expect("L01 occupied");
        let before = column.get(Level::L03).expect("L03 occupied");
        assert_eq!(moved.items, before.items);
        assert_eq!(moved.updated_by, before.updated_by);
        assert_eq!(moved.updated_at, before.updated_at);
        assert_eq!(moved.bay, Bay::B02);
    }

    #[test]
    fn omitted_cells_are_appended_in_prior_order() {
        let column = column_of(&[Level::L01, Level::L02, Level::L03, Level::L04]);
        let ids = column.occupied().map(cell_identity).collect::<Vec<_>>();
        let reordered = reorder_column(&column, &[ids[3].as_str(), "B02::L09::stale"]);

        assert_eq!(
            bundles(&reordered),
            vec![
                (Level::L01, "BN-3".to_string()),
                (Level::L02, "BN-0".to_string()),
                (Level::L03, "BN-1".to_string()),
                (Level::L04, "BN-2".to_string()),
            ]
        );
    }

    #[test]
    fn gaps_are_compacted_from_the_bottom() {
        let column = column_of(&[Level::L02, Level::L05, Level::L09]);
        let reordered = reorder_column::<&str>(&column, &[]);
        assert_eq!(
            reordered.occupied().map(|cell| cell.level).collect::<Vec<_>>(),
            vec![Level::L01, Level::L02, Level::L03]
        );
        assert!(reordered.get(Level::L09).is_none());
    }

    #[test]
    fn empty_bay_stays_empty_whatever_the_list() {
        let column = BayColumn::empty(Bay::B02);
        let reordered = reorder_column(&column, &["B02::L01::x", "B02::L02::y"]);
        assert_eq!(reordered, BayColumn::empty(Bay::B02));
    }

    #[test]
    fn duplicate_identities_do_not_duplicate_cells() {
        let column = column_of(&[Level::L01, Level::L02]);
        let ids = column.occupied().map(cell_identity).collect::<Vec<_>>();
        let reordered = reorder_column(&column, &[&ids[1], &ids[1], &ids[0]]);
        assert_eq!(reordered.occupied_count(), 2);
    }

    #[test]
    fn every_permutation_preserves_the_cell_set() {
        let column = column_of(&[Level::L01, Level::L02, Level::L03]);
        let ids = column.occupied().map(cell_identity).collect::<Vec<_>>();
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut expected = bundles(&column)
            .into_iter()
            .map(|(_, bundle)| bundle)
            .collect::<Vec<_>>();
        expected.sort();

        for order in permutations {
            let list = order.iter().map(|index| ids[*index].as_str()).collect::<Vec<_>>();
            let reordered = reorder_column(&column, &list);
            let mut actual = bundles(&reordered)
                .into_iter()
                .map(|(_, bundle)| bundle)
                .collect::<Vec<_>>();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn move_to_top_lifts_target_above_others() {
        let column = column_of(&[Level::L01, Level::L03, Level::L04]);
        let lifted = move_to_top(&column, Level::L01);
        assert_eq!(
            bundles(&lifted),
            vec![
                (Level::L01, "BN-1".to_string()),
                (Level::L02, "BN-2".to_string()),
                (Level::L03, "BN-0".to_string()),
            ]
        );
    }

    #[test]
    fn restack_retags_levels() {
        let cells = vec![cell(Level::L07, "45x90", "A"), cell(Level::L02, "64x90", "B")];
        let column = restack(Bay::B02, cells);
        assert_eq!(
            bundles(&column),
            vec![(Level::L01, "A".to_string()), (Level::L02, "B".to_string())]
        );
    }
}
