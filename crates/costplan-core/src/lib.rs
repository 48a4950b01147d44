//! # costplan-core
//!
//! Core data structures for the costplan extraction engine.
//!
//! This crate provides the fundamental types the heuristic extractors are
//! built on:
//! - [`CellValue`] - cell contents (numbers, text, formulas with cached results)
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing and ranges
//! - [`FullRef`] and [`RefTarget`] - sheet-qualified references
//! - [`Workbook`], [`Worksheet`] - the in-memory cell grid
//!
//! ## Example
//!
//! ```rust
//! use costplan_core::{parse_ref, RefTarget, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_value("A1", "ЛДСП 16мм").unwrap();
//! sheet.set_value("B1", 42.0).unwrap();
//!
//! // References resolve against an explicit default sheet.
//! let target = parse_ref("B1", Some("Sheet1")).unwrap();
//! assert!(matches!(target, RefTarget::Cell(_)));
//! ```

pub mod cell;
pub mod error;
pub mod reference;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{parse_number, CellAddress, CellRange, CellValue};
pub use error::{Error, Result};
pub use reference::{
    expand_all, expand_target, parse_cell_ref, parse_ref, to_full_ref, FullRange, FullRef,
    RefTarget,
};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (1-3 column letters, A..ZZZ)
pub const MAX_COLS: u16 = 18_278;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
