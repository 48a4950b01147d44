//! Cost breakdown reconstruction
//!
//! Starting from an anchor total cell, rebuilds the per-part rows the
//! total was summed from: one level of formula terms, flat-SUM
//! expansion down to leaf cells, row attribution, and a coverage
//! cross-check of the reconstruction against the anchor's own cached
//! value. Falls back to a raw table scan when the workbook carries no
//! formulas at all.

use std::collections::BTreeMap;

use ahash::AHashSet;
use costplan_core::{expand_all, parse_cell_ref, FullRef, Workbook, Worksheet};
use log::{debug, warn};

use crate::columns::infer_row_context;
use crate::config::CoverageBand;
use crate::formula::{extract_refs, sum_refs};
use crate::mapping::extract_thickness;
use crate::scan::scan_cost_table;
use crate::trace::TraceLeaf;

/// Conventional board-table columns used for row enrichment:
/// name, thickness/material-id, length, width, quantity.
const NAME_COL: u16 = 0;
const THICKNESS_COL: u16 = 1;
const LENGTH_COL: u16 = 2;
const WIDTH_COL: u16 = 3;
const QTY_COL: u16 = 8;

/// Round to 2 decimal places for money output
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One reconstructed part row
///
/// Derived, not authoritative: fields whose source could not be
/// determined are `None`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DetailRow {
    /// Part name
    pub name: Option<String>,
    /// Piece count
    pub qty: Option<f64>,
    /// Length, mm
    pub length_mm: Option<f64>,
    /// Width, mm
    pub width_mm: Option<f64>,
    /// Thickness, mm
    pub thickness_mm: Option<f64>,
    /// Area, m²
    pub area_m2: Option<f64>,
    /// Summed cost of the row's leaves
    pub cost: f64,
    /// 1-based source row number, as displayed
    pub source_row: u32,
}

/// Cost-per-area rates derived from a breakdown
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rates {
    /// Overall cost per m², when any area was recovered
    pub avg_rate: Option<f64>,
    /// Cost per m² grouped by rounded thickness class (mm)
    pub by_thickness: BTreeMap<u32, f64>,
}

/// How the breakdown was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BreakdownMethod {
    /// Unwound from the anchor's formula terms
    FormulaTerms,
    /// Fallback scan of a formula-less table
    TableScan,
}

/// Diagnostic counters surfaced alongside the result
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BreakdownDiag {
    /// How the breakdown was obtained
    pub method: BreakdownMethod,
    /// Why extraction degraded, when it did
    pub reason: Option<String>,
    /// The anchor's formula text, when present
    pub formula: Option<String>,
    /// Direct term references of the anchor formula
    pub terms: Vec<FullRef>,
    /// Which term each leaf came from
    pub leaf_term: BTreeMap<FullRef, FullRef>,
    /// Number of distinct leaves
    pub leaf_count: usize,
}

/// A reconstructed cost breakdown
///
/// Created fresh per anchor per workbook and never mutated afterwards.
/// `usable == false` means rate figures derived from it should not be
/// trusted; the rows are still returned for inspection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Breakdown {
    /// The anchor cell's own cached value (0 if unreadable)
    pub anchor_value: f64,
    /// Distinct leaf cells, sorted by sheet, row, column
    pub leaves: Vec<FullRef>,
    /// Reconstructed rows, grouped by source row
    pub rows: Vec<DetailRow>,
    /// Sum of leaf costs
    pub leaf_sum: f64,
    /// Sum of recovered row areas, m²
    pub area_sum: f64,
    /// leaf_sum / anchor_value (None when the anchor value is not positive)
    pub coverage: Option<f64>,
    /// Whether the reconstruction passed its acceptance band
    pub usable: bool,
    /// Cost-per-area rates
    pub rates: Rates,
    /// Diagnostics
    pub diag: BreakdownDiag,
}

impl Breakdown {
    fn degraded(anchor_value: f64, method: BreakdownMethod, reason: impl Into<String>) -> Self {
        Self {
            anchor_value,
            leaves: Vec::new(),
            rows: Vec::new(),
            leaf_sum: 0.0,
            area_sum: 0.0,
            coverage: None,
            usable: false,
            rates: Rates::default(),
            diag: BreakdownDiag {
                method,
                reason: Some(reason.into()),
                formula: None,
                terms: Vec::new(),
                leaf_term: BTreeMap::new(),
                leaf_count: 0,
            },
        }
    }
}

/// Options for [`build_breakdown`]
#[derive(Debug, Clone, Default)]
pub struct BreakdownOptions {
    /// Acceptance band for the coverage ratio
    pub coverage_band: CoverageBand,
    /// Sheet for resolving an unqualified anchor reference
    pub default_sheet: Option<String>,
}

struct Term {
    cell: FullRef,
    value: Option<f64>,
    formula: Option<String>,
}

/// Build a cost breakdown from an anchor total cell
pub fn build_breakdown(
    workbook: &Workbook,
    anchor_ref: &str,
    options: &BreakdownOptions,
) -> Breakdown {
    let Some(anchor) = parse_cell_ref(anchor_ref, options.default_sheet.as_deref()) else {
        return Breakdown::degraded(0.0, BreakdownMethod::FormulaTerms, "bad anchor reference");
    };
    let Some(sheet) = workbook.worksheet_by_name(&anchor.sheet) else {
        return Breakdown::degraded(0.0, BreakdownMethod::FormulaTerms, "anchor sheet not found");
    };

    let anchor_cell = sheet.value_at(anchor.addr.row, anchor.addr.col);
    let anchor_value = anchor_cell.as_number().unwrap_or(0.0);
    let formula = anchor_cell.formula_body().map(str::to_string);

    let Some(formula) = formula else {
        return fallback_scan(sheet, anchor_value, "anchor cell has no formula");
    };

    // One level of expansion: the formula's direct summands
    let terms: Vec<FullRef> = expand_all(extract_refs(&formula), Some(&anchor.sheet));
    if terms.is_empty() {
        return fallback_scan(sheet, anchor_value, "no reference terms in anchor formula");
    }

    let terms: Vec<Term> = terms
        .into_iter()
        .map(|cell| {
            let value = workbook
                .worksheet_by_name(&cell.sheet)
                .and_then(|ws| ws.number_at(cell.addr.row, cell.addr.col));
            let term_formula = workbook
                .worksheet_by_name(&cell.sheet)
                .and_then(|ws| ws.formula_body_at(cell.addr.row, cell.addr.col))
                .map(str::to_string);
            Term {
                cell,
                value,
                formula: term_formula,
            }
        })
        .collect();

    // Templates keep placeholder columns around; prefer the terms that
    // actually carry a value, but keep everything when all are zero.
    let non_zero: Vec<&Term> = terms
        .iter()
        .filter(|t| t.value.map_or(false, |v| v != 0.0))
        .collect();
    let active: Vec<&Term> = if non_zero.is_empty() {
        terms.iter().collect()
    } else {
        non_zero
    };

    // Expand each term to its leaves: a flat SUM unfolds to the summed
    // cells, anything else is a leaf itself. Deeper unwinding is the
    // tracer's job, not this builder's.
    let mut leaves: Vec<FullRef> = Vec::new();
    let mut seen: AHashSet<FullRef> = AHashSet::new();
    let mut leaf_term: BTreeMap<FullRef, FullRef> = BTreeMap::new();

    for term in &active {
        let summed = term.formula.as_deref().map(sum_refs).unwrap_or_default();
        if summed.is_empty() {
            if seen.insert(term.cell.clone()) {
                leaves.push(term.cell.clone());
                leaf_term.insert(term.cell.clone(), term.cell.clone());
            }
        } else {
            for bare in summed {
                let Some(leaf) = parse_cell_ref(&bare, Some(&term.cell.sheet)) else {
                    continue;
                };
                if leaf == term.cell {
                    continue; // a sum never feeds its own cell
                }
                if seen.insert(leaf.clone()) {
                    leaf_term.insert(leaf.clone(), term.cell.clone());
                    leaves.push(leaf);
                }
            }
        }
    }

    leaves.sort();

    // Group leaves by source row, summing their costs
    struct RowAgg {
        cost: f64,
        first_leaf_col: u16,
    }
    let mut by_row: BTreeMap<(String, u32), RowAgg> = BTreeMap::new();
    let mut leaf_sum = 0.0;

    for leaf in &leaves {
        let cost = workbook
            .worksheet_by_name(&leaf.sheet)
            .and_then(|ws| ws.number_at(leaf.addr.row, leaf.addr.col))
            .unwrap_or(0.0);
        leaf_sum += cost;
        if cost == 0.0 {
            continue;
        }
        by_row
            .entry((leaf.sheet.clone(), leaf.addr.row))
            .and_modify(|agg| agg.cost += cost)
            .or_insert(RowAgg {
                cost,
                first_leaf_col: leaf.addr.col,
            });
    }

    let mut rows = Vec::with_capacity(by_row.len());
    let mut area_sum = 0.0;

    for ((sheet_name, row), agg) in &by_row {
        let Some(ws) = workbook.worksheet_by_name(sheet_name) else {
            continue;
        };
        let detail = enrich_conventional_row(ws, *row, agg.cost, agg.first_leaf_col);
        if let Some(area) = detail.area_m2 {
            area_sum += area;
        }
        rows.push(detail);
    }

    let coverage = (anchor_value > 0.0).then(|| leaf_sum / anchor_value);
    let usable = coverage.map_or(false, |c| options.coverage_band.contains(c))
        && leaf_sum > 0.0
        && !rows.is_empty();
    if let Some(c) = coverage {
        if !options.coverage_band.contains(c) {
            warn!(
                "breakdown of {} coverage {:.3} outside band {:.2}..{:.2}",
                anchor, c, options.coverage_band.min, options.coverage_band.max
            );
        }
    }

    let rates = build_rates(&rows, leaf_sum, area_sum);

    debug!(
        "breakdown of {}: {} terms, {} leaves, leaf_sum {:.2}, coverage {:?}",
        anchor,
        active.len(),
        leaves.len(),
        leaf_sum,
        coverage
    );

    Breakdown {
        anchor_value,
        leaf_sum,
        area_sum,
        coverage,
        usable,
        rates,
        diag: BreakdownDiag {
            method: BreakdownMethod::FormulaTerms,
            reason: None,
            formula: Some(formula),
            terms: active.iter().map(|t| t.cell.clone()).collect(),
            leaf_term,
            leaf_count: leaves.len(),
        },
        leaves,
        rows,
    }
}

/// Read the conventional board-table columns around a leaf's row
fn enrich_conventional_row(sheet: &Worksheet, row: u32, cost: f64, leaf_col: u16) -> DetailRow {
    let name = sheet
        .text_at(row, NAME_COL)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let thickness = sheet
        .number_at(row, THICKNESS_COL)
        .or_else(|| sheet.text_at(row, THICKNESS_COL).and_then(extract_thickness));
    let length = sheet.number_at(row, LENGTH_COL);
    let width = sheet.number_at(row, WIDTH_COL);
    let qty = sheet.number_at(row, QTY_COL);

    // Area either derives from the dimensions or is read from the cell
    // left of the leaf, where per-column area subtotals keep it
    let area = match (length, width, qty) {
        (Some(l), Some(w), Some(q)) if q > 0.0 => Some(l / 1000.0 * (w / 1000.0) * q),
        _ => leaf_col
            .checked_sub(1)
            .and_then(|c| sheet.number_at(row, c))
            .filter(|a| *a > 0.0),
    };

    DetailRow {
        name,
        qty,
        length_mm: length,
        width_mm: width,
        thickness_mm: thickness,
        area_m2: area,
        cost: round2(cost),
        source_row: row + 1,
    }
}

fn fallback_scan(sheet: &Worksheet, anchor_value: f64, reason: &str) -> Breakdown {
    let Some(outcome) = scan_cost_table(sheet, (anchor_value != 0.0).then_some(anchor_value))
    else {
        return Breakdown::degraded(anchor_value, BreakdownMethod::FormulaTerms, reason);
    };

    let rates = build_rates(&outcome.rows, outcome.leaf_sum, outcome.area_sum);
    let leaf_count = outcome.leaves.len();

    Breakdown {
        anchor_value,
        leaves: outcome.leaves,
        rows: outcome.rows,
        leaf_sum: outcome.leaf_sum,
        area_sum: outcome.area_sum,
        coverage: outcome.coverage,
        // The scan only returns when area and cost sums are positive
        usable: true,
        rates,
        diag: BreakdownDiag {
            method: BreakdownMethod::TableScan,
            reason: Some(reason.to_string()),
            formula: None,
            terms: Vec::new(),
            leaf_term: BTreeMap::new(),
            leaf_count,
        },
    }
}

fn build_rates(rows: &[DetailRow], leaf_sum: f64, area_sum: f64) -> Rates {
    let mut grouped: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let Some(area) = row.area_m2 else {
            continue;
        };
        if area <= 0.0 || row.cost <= 0.0 {
            continue;
        }
        if let Some(thickness) = row.thickness_mm {
            let entry = grouped.entry(thickness.round() as u32).or_insert((0.0, 0.0));
            entry.0 += area;
            entry.1 += row.cost;
        }
    }

    let by_thickness = grouped
        .into_iter()
        .filter(|(_, (area, cost))| *area > 0.0 && *cost > 0.0)
        .map(|(mm, (area, cost))| (mm, cost / area))
        .collect();

    Rates {
        avg_rate: (area_sum > 0.0).then(|| leaf_sum / area_sum),
        by_thickness,
    }
}

/// Enrich traced leaves into detail rows via column-role inference
///
/// The generic counterpart of the conventional-column enrichment above:
/// leaves grouped by source row, each row's context reconstructed from
/// its table's inferred header.
pub fn enrich_leaves(workbook: &Workbook, leaves: &[TraceLeaf]) -> Vec<DetailRow> {
    let mut by_row: BTreeMap<(String, u32), f64> = BTreeMap::new();
    for leaf in leaves {
        *by_row
            .entry((leaf.reference.sheet.clone(), leaf.reference.addr.row))
            .or_insert(0.0) += leaf.value;
    }

    let mut rows = Vec::with_capacity(by_row.len());
    for ((sheet_name, row), cost) in by_row {
        let Some(sheet) = workbook.worksheet_by_name(&sheet_name) else {
            continue;
        };
        let ctx = infer_row_context(sheet, row);
        let area = ctx.area_m2.or_else(|| {
            match (ctx.length_mm, ctx.width_mm, ctx.qty) {
                (Some(l), Some(w), Some(q)) if q > 0.0 => Some(l / 1000.0 * (w / 1000.0) * q),
                _ => None,
            }
        });
        rows.push(DetailRow {
            name: ctx.name,
            qty: ctx.qty,
            length_mm: ctx.length_mm,
            width_mm: ctx.width_mm,
            thickness_mm: ctx.thickness,
            area_m2: area,
            cost: round2(cost),
            source_row: row + 1,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Board-material sheet in the conventional layout: name in A,
    /// thickness in B, length in C, width in D, quantity in I, per-part
    /// costs in M, an extra charge in O.
    fn board_workbook() -> Workbook {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Плитн. материалы").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();

        // (name, thickness, len, wid, qty, cost)
        let parts: [(&str, f64, f64, f64, f64, f64); 3] = [
            ("Бок", 16.0, 600.0, 400.0, 2.0, 100.0),
            ("Дно", 16.0, 800.0, 300.0, 1.0, 50.0),
            ("Крышка", 18.0, 500.0, 500.0, 2.0, 80.0),
        ];
        for (i, (name, th, len, wid, qty, cost)) in parts.iter().enumerate() {
            let r = i as u32;
            ws.set_value_at(r, 0, *name).unwrap();
            ws.set_value_at(r, 1, *th).unwrap();
            ws.set_value_at(r, 2, *len).unwrap();
            ws.set_value_at(r, 3, *wid).unwrap();
            ws.set_value_at(r, 8, *qty).unwrap();
            ws.set_value_at(r, 12, *cost).unwrap(); // column M
        }

        // Per-column subtotal and an extra flat charge
        ws.set_formula_with_cached("M4", "=SUM(M1:M3)", 230.0).unwrap();
        ws.set_value("O4", 20.0).unwrap();
        ws.set_value("N4", 0.5).unwrap(); // area subtotal left of O4

        // The anchor total
        ws.set_value("A7", "Стоимость ДСП").unwrap();
        ws.set_formula_with_cached("B7", "=M4+O4", 250.0).unwrap();

        wb
    }

    #[test]
    fn test_sum_terms_expand_to_leaves_not_subtotals() {
        let wb = board_workbook();
        let b = build_breakdown(
            &wb,
            "'Плитн. материалы'!B7",
            &BreakdownOptions::default(),
        );

        let leaf_names: Vec<String> = b.leaves.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            leaf_names,
            vec![
                "Плитн. материалы!M1",
                "Плитн. материалы!M2",
                "Плитн. материалы!M3",
                "Плитн. материалы!O4",
            ]
        );
        // The subtotal cell itself is not a leaf
        assert!(!leaf_names.iter().any(|l| l.ends_with("!M4")));
    }

    #[test]
    fn test_coverage_and_rows() {
        let wb = board_workbook();
        let b = build_breakdown(
            &wb,
            "'Плитн. материалы'!B7",
            &BreakdownOptions::default(),
        );

        assert_eq!(b.anchor_value, 250.0);
        assert_eq!(b.leaf_sum, 250.0);
        assert_eq!(b.coverage, Some(1.0));
        assert!(b.usable);

        assert_eq!(b.rows.len(), 4);
        let first = &b.rows[0];
        assert_eq!(first.name.as_deref(), Some("Бок"));
        assert_eq!(first.qty, Some(2.0));
        assert_eq!(first.thickness_mm, Some(16.0));
        assert!((first.area_m2.unwrap() - 0.48).abs() < 1e-9);
        assert_eq!(first.cost, 100.0);
        assert_eq!(first.source_row, 1);

        // The extra-charge row has no dimensions; area comes from the
        // cell left of its leaf
        let extra = b.rows.iter().find(|r| r.source_row == 4).unwrap();
        assert_eq!(extra.area_m2, Some(0.5));
        assert_eq!(extra.cost, 20.0);
    }

    #[test]
    fn test_rates_by_thickness() {
        let wb = board_workbook();
        let b = build_breakdown(
            &wb,
            "'Плитн. материалы'!B7",
            &BreakdownOptions::default(),
        );

        // 16mm: (100 + 50) / (0.48 + 0.24); 18mm: 80 / 0.5
        let r16 = b.rates.by_thickness.get(&16).copied().unwrap();
        let r18 = b.rates.by_thickness.get(&18).copied().unwrap();
        assert!((r16 - 150.0 / 0.72).abs() < 1e-9);
        assert!((r18 - 160.0).abs() < 1e-9);

        let total_area = 0.48 + 0.24 + 0.5 + 0.5;
        assert!((b.rates.avg_rate.unwrap() - 250.0 / total_area).abs() < 1e-9);
    }

    #[test]
    fn test_coverage_outside_band_not_usable() {
        let mut wb = board_workbook();
        // Anchor claims more than the leaves can explain
        wb.worksheet_mut(0)
            .unwrap()
            .set_formula_with_cached("B7", "=M4+O4", 400.0)
            .unwrap();

        let b = build_breakdown(
            &wb,
            "'Плитн. материалы'!B7",
            &BreakdownOptions::default(),
        );
        assert_eq!(b.coverage, Some(250.0 / 400.0));
        assert!(!b.usable);
        // Best-effort rows still come back for inspection
        assert_eq!(b.rows.len(), 4);

        // A band wide enough accepts the same reconstruction
        let b = build_breakdown(
            &wb,
            "'Плитн. материалы'!B7",
            &BreakdownOptions {
                coverage_band: CoverageBand { min: 0.5, max: 1.5 },
                default_sheet: None,
            },
        );
        assert!(b.usable);
    }

    #[test]
    fn test_zero_terms_kept_when_all_zero() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        ws.set_formula_with_cached("B1", "=M1+O1", 0.0).unwrap();
        ws.set_value("A5", 1.0).unwrap(); // keep the sheet non-empty

        let b = build_breakdown(&wb, "S!B1", &BreakdownOptions::default());
        // Both zero-valued terms survive the active filter
        assert_eq!(b.diag.terms.len(), 2);
        assert_eq!(b.leaves.len(), 2);
        assert!(!b.usable);
    }

    #[test]
    fn test_nonzero_terms_preferred() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        ws.set_value("M1", 30.0).unwrap();
        ws.set_formula_with_cached("B1", "=M1+O1+P1", 30.0).unwrap();

        let b = build_breakdown(&wb, "S!B1", &BreakdownOptions::default());
        // The placeholder terms O1/P1 are dropped
        assert_eq!(b.diag.terms.len(), 1);
        assert_eq!(b.leaves.len(), 1);
        assert_eq!(b.leaf_sum, 30.0);
    }

    #[test]
    fn test_fallback_scan_when_no_formula() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Расчет").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();

        let headers = ["Деталь", "Длина", "Ширина", "Кол-во", "Цена"];
        for (c, h) in headers.iter().enumerate() {
            ws.set_value_at(0, c as u16, *h).unwrap();
        }
        ws.set_value_at(1, 0, "Бок").unwrap();
        ws.set_value_at(1, 1, 600.0).unwrap();
        ws.set_value_at(1, 2, 400.0).unwrap();
        ws.set_value_at(1, 3, 2.0).unwrap();
        ws.set_value_at(1, 4, 120.0).unwrap();

        // Pre-computed anchor, no formula
        ws.set_value("G1", 120.0).unwrap();

        let b = build_breakdown(&wb, "Расчет!G1", &BreakdownOptions::default());
        assert_eq!(b.diag.method, BreakdownMethod::TableScan);
        assert!(b.usable);
        assert_eq!(b.leaf_sum, 120.0);
        assert_eq!(b.coverage, Some(1.0));
    }

    #[test]
    fn test_degraded_when_nothing_to_extract() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        wb.worksheet_mut(0).unwrap().set_value("B1", 55.0).unwrap();

        let b = build_breakdown(&wb, "S!B1", &BreakdownOptions::default());
        assert!(!b.usable);
        assert_eq!(b.anchor_value, 55.0);
        assert!(b.diag.reason.is_some());
        assert!(b.leaves.is_empty());

        // Unresolvable anchors degrade the same way
        let b = build_breakdown(&wb, "garbage", &BreakdownOptions::default());
        assert!(!b.usable);
        assert_eq!(b.anchor_value, 0.0);
    }

    #[test]
    fn test_enrich_leaves_via_inference() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Детали").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();

        let headers = ["Наименование", "Длина", "Ширина", "Кол-во", "Площадь"];
        for (c, h) in headers.iter().enumerate() {
            ws.set_value_at(0, c as u16, *h).unwrap();
        }
        ws.set_value_at(1, 0, "Полка").unwrap();
        ws.set_value_at(1, 1, 600.0).unwrap();
        ws.set_value_at(1, 2, 200.0).unwrap();
        ws.set_value_at(1, 3, 3.0).unwrap();
        ws.set_value_at(1, 4, 0.36).unwrap();

        let leaves = vec![
            TraceLeaf {
                reference: parse_cell_ref("Детали!G2", None).unwrap(),
                value: 55.0,
            },
            TraceLeaf {
                reference: parse_cell_ref("Детали!H2", None).unwrap(),
                value: 5.0,
            },
        ];

        let rows = enrich_leaves(&wb, &leaves);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.name.as_deref(), Some("Полка"));
        assert_eq!(row.qty, Some(3.0));
        assert_eq!(row.area_m2, Some(0.36));
        // Two leaves on the same row merge by summation
        assert_eq!(row.cost, 60.0);
        assert_eq!(row.source_row, 2);
    }
}
