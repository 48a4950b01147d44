//! Fallback table scan
//!
//! Flat, pre-computed workbooks carry no formulas to unwind. When the
//! anchor cell has none, the host sheet is scanned directly for a parts
//! table: a header row naming dimensions, quantity, and price, followed
//! by data rows until the first fully-empty row.

use costplan_core::{CellAddress, FullRef, Worksheet};
use log::debug;

use crate::breakdown::{round2, DetailRow};
use crate::config::DEFAULT_BOARD_THICKNESS_MM;

/// Result of a successful table scan
///
/// Returned only when both the area and cost sums came out positive;
/// anything less means the sheet held no usable table.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Cost cells treated as leaves
    pub leaves: Vec<FullRef>,
    /// Reconstructed part rows
    pub rows: Vec<DetailRow>,
    /// Sum of row costs
    pub leaf_sum: f64,
    /// Sum of row areas, m²
    pub area_sum: f64,
    /// Average cost per m²
    pub avg_rate: f64,
    /// leaf_sum / anchor value, when an anchor value was supplied
    pub coverage: Option<f64>,
}

fn find_col<F: Fn(&str) -> bool>(sheet: &Worksheet, row: u32, pred: F) -> Option<u16> {
    sheet.row_cells(row).find_map(|(col, value)| {
        let text = value.as_text()?;
        pred(&text.to_lowercase()).then_some(col)
    })
}

/// Scan a sheet for a flat cost table
///
/// The header row is the first whose joined text mentions length,
/// width, quantity, and a price-like token at once. Data rows are read
/// until the first fully-empty row; individual rows missing dims or
/// with non-positive cost are skipped but do not stop the scan.
pub fn scan_cost_table(sheet: &Worksheet, anchor_value: Option<f64>) -> Option<ScanOutcome> {
    let used = sheet.used_range()?;

    let mut header_row = None;
    for row in used.start.row..=used.end.row {
        let joined: String = sheet
            .row_cells(row)
            .filter_map(|(_, v)| v.as_text())
            .map(|t| t.to_lowercase())
            .collect::<Vec<_>>()
            .join(" | ");
        if joined.contains("длин")
            && joined.contains("ширин")
            && joined.contains("кол")
            && (joined.contains("цен") || joined.contains("стоим") || joined.contains("руб"))
        {
            header_row = Some(row);
            break;
        }
    }
    let header_row = header_row?;

    let name_col = find_col(sheet, header_row, |t| {
        t.contains("плита") || t.contains("наимен") || t.contains("детал")
    });
    let len_col = find_col(sheet, header_row, |t| t.contains("длин"))?;
    let wid_col = find_col(sheet, header_row, |t| t.contains("ширин"))?;
    let qty_col = find_col(sheet, header_row, |t| t.contains("кол"))?;
    let area_col = find_col(sheet, header_row, |t| t.contains("площ"));
    let cost_col = find_col(sheet, header_row, |t| {
        t.contains("цен") || t.contains("стоим") || t.contains("руб")
    })?;

    let mut leaves = Vec::new();
    let mut rows = Vec::new();
    let mut area_sum = 0.0;
    let mut leaf_sum = 0.0;

    for row in header_row + 1..=used.end.row {
        let name = sheet
            .text_at(row, name_col.unwrap_or(0))
            .or_else(|| sheet.text_at(row, 0))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let len = sheet.number_at(row, len_col);
        let wid = sheet.number_at(row, wid_col);
        let qty = sheet.number_at(row, qty_col);
        let cost = sheet.number_at(row, cost_col);
        let area = match area_col {
            Some(c) => sheet.number_at(row, c),
            None => match (len, wid, qty) {
                (Some(l), Some(w), Some(q)) if l != 0.0 && w != 0.0 && q != 0.0 => {
                    Some(l * w * q / 1e6)
                }
                _ => None,
            },
        };

        let has_number = [len, wid, qty, cost]
            .iter()
            .any(|v| v.map_or(false, |x| x != 0.0));
        if name.is_none() && !has_number {
            // First fully-empty row ends the table
            break;
        }

        let dims_present = [len, wid, qty].iter().all(|v| v.map_or(false, |x| x != 0.0));
        if !dims_present {
            continue;
        }
        let Some(cost) = cost.filter(|c| *c > 0.0) else {
            continue;
        };

        leaves.push(FullRef::new(
            sheet.name(),
            CellAddress::new(row, cost_col),
        ));

        // Thickness conventionally sits right of the name column
        let thickness_guess = sheet
            .number_at(row, name_col.map(|c| c + 1).unwrap_or(0))
            .unwrap_or(DEFAULT_BOARD_THICKNESS_MM);

        rows.push(DetailRow {
            name,
            qty,
            length_mm: len,
            width_mm: wid,
            thickness_mm: Some(thickness_guess),
            area_m2: area,
            cost: round2(cost),
            source_row: row + 1,
        });

        area_sum += area.unwrap_or(0.0);
        leaf_sum += cost;
    }

    if rows.is_empty() || area_sum <= 0.0 || leaf_sum <= 0.0 {
        return None;
    }

    let avg_rate = leaf_sum / area_sum;
    let coverage = anchor_value
        .filter(|v| *v != 0.0)
        .map(|v| leaf_sum / v);

    debug!(
        "table scan on '{}': {} rows, leaf_sum {:.2}, coverage {:?}",
        sheet.name(),
        rows.len(),
        leaf_sum,
        coverage
    );

    Some(ScanOutcome {
        leaves,
        rows,
        leaf_sum,
        area_sum,
        avg_rate,
        coverage,
    })
}
