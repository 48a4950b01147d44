//! Worksheet type

use crate::cell::{CellAddress, CellGrid, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet (single sheet in a workbook)
#[derive(Debug)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cell storage
    cells: CellGrid,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellGrid::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell access ===

    /// Get a cell value by address string (e.g., "A1")
    pub fn value(&self, address: &str) -> Result<&CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.value_at(addr.row, addr.col))
    }

    /// Get a cell value by row and column indices
    ///
    /// Missing cells read as [`CellValue::Empty`].
    pub fn value_at(&self, row: u32, col: u16) -> &CellValue {
        self.cells.get(row, col).unwrap_or(&EMPTY)
    }

    /// Get the text of a cell, if it holds any
    pub fn text_at(&self, row: u32, col: u16) -> Option<&str> {
        self.value_at(row, col).as_text()
    }

    /// Get the numeric value of a cell, if it coerces to one
    pub fn number_at(&self, row: u32, col: u16) -> Option<f64> {
        self.value_at(row, col).as_number()
    }

    /// Get a cell's formula body (without the leading `=`), if any
    pub fn formula_body_at(&self, row: u32, col: u16) -> Option<&str> {
        self.value_at(row, col).formula_body()
    }

    // === Cell modification ===

    /// Set a cell value by address string
    pub fn set_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        self.cells.set(row, col, value.into());
        Ok(())
    }

    /// Set a cell formula (no cached value) by address string
    pub fn set_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        self.set_value(address, CellValue::formula(formula))
    }

    /// Set a cell formula together with its last computed value
    pub fn set_formula_with_cached<V: Into<CellValue>>(
        &mut self,
        address: &str,
        formula: &str,
        cached: V,
    ) -> Result<()> {
        self.set_value(
            address,
            CellValue::formula_with_cached(formula, cached.into()),
        )
    }

    /// Clear a cell by row and column indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(row, col);
    }

    // === Bounds and iteration ===

    /// The bounding rectangle of all non-empty cells, if any
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells.used_range()
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Iterate over all non-empty cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.cells.cells()
    }

    /// Iterate over the non-empty cells of one row, in column order
    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (u16, &CellValue)> {
        self.cells.row_cells(row)
    }

    /// Iterate over all formula cells with their formula bodies
    pub fn formula_cells(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.cells
            .cells()
            .filter_map(|(addr, value)| value.formula_body().map(|body| (addr, body)))
    }
}
