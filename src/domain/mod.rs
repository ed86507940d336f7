pub mod cell;
pub mod grid;
pub mod matrix;
pub mod measure;
pub mod presets;

pub use cell::{now_utc_rfc3339, Actor, Cell, StackItem};
pub use grid::{Bay, GridParseError, Level};
pub use matrix::{BayColumn, Matrix};
