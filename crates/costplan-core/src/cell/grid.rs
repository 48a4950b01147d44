//! Sparse cell storage
//!
//! Only non-empty cells are stored, using a row-based BTreeMap structure.
//! Row-major iteration order falls out of the map layout, which is the
//! order every scan in the extraction layer wants.

use std::collections::BTreeMap;

use super::{CellAddress, CellRange, CellValue};

/// Sparse row-based storage for worksheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellValue>>`
#[derive(Debug, Default)]
pub struct CellGrid {
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl CellGrid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell value, if present
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Set a cell value; storing `Empty` removes the cell
    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        if value.is_empty() {
            self.remove(row, col);
            return;
        }
        self.rows.entry(row).or_default().insert(col, value);
    }

    /// Remove a cell, returning the previous value if any
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Number of stored (non-empty) cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check whether the grid holds no cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The bounding rectangle of all stored cells
    pub fn used_range(&self) -> Option<CellRange> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0u16;
        for row_map in self.rows.values() {
            if let (Some(first), Some(last)) = (row_map.keys().next(), row_map.keys().next_back()) {
                min_col = min_col.min(*first);
                max_col = max_col.max(*last);
            }
        }

        Some(CellRange::from_indices(min_row, min_col, max_row, max_col))
    }

    /// Iterate over all stored cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.rows.iter().flat_map(|(row, cols)| {
            cols.iter()
                .map(move |(col, value)| (CellAddress::new(*row, *col), value))
        })
    }

    /// Iterate over the stored cells of one row, in column order
    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (u16, &CellValue)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(col, value)| (*col, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut grid = CellGrid::new();
        grid.set(0, 0, CellValue::Number(1.0));
        grid.set(2, 3, CellValue::from("x"));

        assert_eq!(grid.get(0, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(grid.get(1, 1), None);
        assert_eq!(grid.cell_count(), 2);

        grid.remove(0, 0);
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn test_setting_empty_removes() {
        let mut grid = CellGrid::new();
        grid.set(5, 5, CellValue::Number(9.0));
        grid.set(5, 5, CellValue::Empty);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_used_range() {
        let mut grid = CellGrid::new();
        assert_eq!(grid.used_range(), None);

        grid.set(1, 2, CellValue::Number(1.0));
        grid.set(4, 0, CellValue::Number(2.0));
        grid.set(2, 7, CellValue::Number(3.0));

        let range = grid.used_range().unwrap();
        assert_eq!(range.start, CellAddress::new(1, 0));
        assert_eq!(range.end, CellAddress::new(4, 7));
    }

    #[test]
    fn test_cells_are_row_major() {
        let mut grid = CellGrid::new();
        grid.set(1, 1, CellValue::Number(3.0));
        grid.set(0, 2, CellValue::Number(2.0));
        grid.set(0, 0, CellValue::Number(1.0));

        let addrs: Vec<_> = grid.cells().map(|(a, _)| a.to_string()).collect();
        assert_eq!(addrs, vec!["A1", "C1", "B2"]);
    }
}
