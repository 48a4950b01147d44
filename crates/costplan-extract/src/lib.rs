//! # costplan-extract
//!
//! Heuristic extraction of a structured cost/quantity model from
//! irregular, untrusted spreadsheet grids.
//!
//! The workbooks this crate reads are authored by many different people
//! with no fixed layout: inconsistent column order, label synonyms and
//! spelling variants, totals assembled from arbitrary sums. Extraction
//! therefore never evaluates formulas; it resolves their reference
//! *topology*, cross-checks the reconstruction numerically, and reports
//! how trustworthy the result is instead of guessing silently.
//!
//! The pipeline, leaf-first:
//! - [`formula`] - reference-token scanning over formula text
//! - [`label`] - label normalization and anchor resolution
//! - [`trace`] - recursive dependency tracing down to leaf cells
//! - [`columns`] - column-role inference over free-form parts tables
//! - [`breakdown`] - cost breakdown reconstruction with coverage checks
//! - [`scan`] - fallback table scan for formula-less workbooks
//! - [`mapping`] - auto-detected sheet mappings (dictionaries, dimensions)
//! - [`summary`] - the one-call façade over all of the above
//!
//! ## Example
//!
//! ```rust
//! use costplan_core::Workbook;
//! use costplan_extract::{build_breakdown, BreakdownOptions};
//!
//! let mut wb = Workbook::empty();
//! wb.add_worksheet_with_name("Расчет").unwrap();
//! let ws = wb.worksheet_mut(0).unwrap();
//! ws.set_value("M1", 120.0).unwrap();
//! ws.set_value("M2", 80.0).unwrap();
//! ws.set_formula_with_cached("B7", "=SUM(M1:M2)", 200.0).unwrap();
//!
//! let b = build_breakdown(&wb, "Расчет!B7", &BreakdownOptions::default());
//! assert_eq!(b.leaf_sum, 200.0);
//! assert!(b.usable);
//! ```
//!
//! Every failure mode is local: a malformed reference, a missing sheet,
//! or an unmatched label degrades that one extraction to an empty or
//! unusable result and never aborts the others.

pub mod breakdown;
pub mod columns;
pub mod config;
pub mod formula;
pub mod label;
pub mod mapping;
pub mod scan;
pub mod summary;
pub mod trace;

// Re-exports for convenience
pub use breakdown::{
    build_breakdown, enrich_leaves, Breakdown, BreakdownDiag, BreakdownMethod, BreakdownOptions,
    DetailRow, Rates,
};
pub use columns::{find_header_row, infer_columns, infer_row_context, ColumnRoles, RowContext};
pub use config::CoverageBand;
pub use formula::{extract_bare_refs, extract_refs, sum_refs};
pub use label::{
    apply_overrides, normalize_label, read_anchor_value, resolve_anchors, AnchorKey, AnchorMap,
};
pub use mapping::{
    auto_detect_mapping, parse_dimensions, parse_material_dictionary, parse_part_rows, Dimensions,
    Material, Part, SheetMapping,
};
pub use scan::{scan_cost_table, ScanOutcome};
pub use summary::{build_summary, BaseValues, Summary, SummaryOptions};
pub use trace::{
    trace_leaves, trace_leaves_with_visited, TraceLeaf, TraceNode, TraceOptions, TraceResult,
};
