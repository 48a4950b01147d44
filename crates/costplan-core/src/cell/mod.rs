//! Cell types: addresses, ranges, values, and sparse grid storage

mod address;
mod grid;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use grid::CellGrid;
pub use value::{parse_number, CellValue};
