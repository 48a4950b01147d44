//! Column-role inference
//!
//! Free-form parts tables have no fixed layout: which column holds the
//! name, the quantity, the dimensions varies per author. Roles are
//! assigned from header text, then cross-checked against the physical
//! consistency of the rows themselves (area ≈ length × width ×
//! quantity) when header text alone is ambiguous.

use costplan_core::Worksheet;
use log::debug;

use crate::config::{
    HEADER_SEARCH_WINDOW, INTEGER_PENALTY_WEIGHT, MIN_QTY_SAMPLE_ROWS, QTY_SAMPLE_WINDOW,
};
use crate::label::normalize_label;

/// Column indices assigned to semantic roles, plus the header row they
/// were read from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ColumnRoles {
    /// The header row the roles were inferred from (0-based)
    pub header_row: u32,
    /// Part name column
    pub name: Option<u16>,
    /// Thickness / material-id column
    pub thickness: Option<u16>,
    /// Quantity column (disambiguated)
    pub qty: Option<u16>,
    /// Length column, mm
    pub length: Option<u16>,
    /// Width column, mm
    pub width: Option<u16>,
    /// Area column, m²
    pub area: Option<u16>,
    /// Cost column
    pub cost: Option<u16>,
    /// All columns whose header matched a quantity token
    pub qty_candidates: Vec<u16>,
}

/// Contextual fields reconstructed for one table row
///
/// A field whose column could not be determined is `None`: unknown,
/// never zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RowContext {
    /// The data row (0-based)
    pub row: u32,
    /// Part name
    pub name: Option<String>,
    /// Piece count
    pub qty: Option<f64>,
    /// Area, m²
    pub area_m2: Option<f64>,
    /// Thickness, mm
    pub thickness: Option<f64>,
    /// Length, mm
    pub length_mm: Option<f64>,
    /// Width, mm
    pub width_mm: Option<f64>,
    /// The roles the fields were read through (diagnostics)
    pub roles: Option<ColumnRoles>,
}

impl RowContext {
    fn bare(row: u32) -> Self {
        Self {
            row,
            name: None,
            qty: None,
            area_m2: None,
            thickness: None,
            length_mm: None,
            width_mm: None,
            roles: None,
        }
    }
}

/// Find the nearest header row above a data row
///
/// A header row is one whose normalized cell texts include both a
/// name-like and a quantity-like token. The search is bounded to
/// [`HEADER_SEARCH_WINDOW`] rows.
pub fn find_header_row(sheet: &Worksheet, row: u32) -> Option<u32> {
    let stop = row.saturating_sub(HEADER_SEARCH_WINDOW);
    for candidate in (stop..row).rev() {
        let mut has_name = false;
        let mut has_qty = false;
        for (_, value) in sheet.row_cells(candidate) {
            if let Some(text) = value.as_text() {
                let normalized = normalize_label(text);
                has_name = has_name || normalized.contains("наимен");
                has_qty = has_qty || normalized.contains("кол");
            }
        }
        if has_name && has_qty {
            return Some(candidate);
        }
    }
    None
}

/// Infer column roles for the table a data row belongs to
pub fn infer_columns(sheet: &Worksheet, row: u32) -> Option<ColumnRoles> {
    let header_row = find_header_row(sheet, row)?;

    let mut roles = ColumnRoles {
        header_row,
        name: None,
        thickness: None,
        qty: None,
        length: None,
        width: None,
        area: None,
        cost: None,
        qty_candidates: Vec::new(),
    };
    let mut length_candidates = Vec::new();
    let mut width_candidates = Vec::new();
    let mut area_candidates = Vec::new();
    let mut cost_candidates = Vec::new();

    for (col, value) in sheet.row_cells(header_row) {
        let Some(text) = value.as_text() else {
            continue;
        };
        let t = normalize_label(text);
        if t.contains("наимен") {
            roles.name = Some(col);
        }
        if t.contains("кол") || t.contains("qty") || t.contains("шт") {
            roles.qty_candidates.push(col);
        }
        if t.contains("площад") {
            area_candidates.push(col);
        }
        if t.contains("стоим") || t.contains("цена") || t.contains("cost") {
            cost_candidates.push(col);
        }
        if t.contains("длин") {
            length_candidates.push(col);
        }
        if t.contains("ширин") {
            width_candidates.push(col);
        }
        if t.contains("толщ") {
            roles.thickness = Some(col);
        }
    }

    // Later columns in these templates are conventionally the finalized
    // ones, so the last candidate is the default pick.
    roles.qty = roles.qty_candidates.last().copied();
    roles.area = area_candidates.last().copied();
    roles.cost = cost_candidates.last().copied();
    roles.length = length_candidates.last().copied();
    roles.width = width_candidates.last().copied();

    disambiguate_qty(sheet, row, &mut roles);

    Some(roles)
}

/// Pick the physically consistent quantity column among the candidates
///
/// Templates often carry both an engineering quantity and a "real"
/// ordered quantity; the last column is not always the meaningful one.
/// Each candidate is scored over a sample of surrounding rows against
/// the expected count `area / (length × width / 1e6)`; the candidate
/// with the lowest average error wins.
fn disambiguate_qty(sheet: &Worksheet, row: u32, roles: &mut ColumnRoles) {
    if roles.qty_candidates.len() < 2 {
        return;
    }
    let (Some(length_col), Some(width_col), Some(area_col)) =
        (roles.length, roles.width, roles.area)
    else {
        return;
    };

    let last_row = sheet.used_range().map(|r| r.end.row).unwrap_or(row);
    let start = (roles.header_row + 1).max(row.saturating_sub(QTY_SAMPLE_WINDOW));
    let end = last_row.min(row + QTY_SAMPLE_WINDOW);

    let mut best: Option<(u16, f64)> = None;
    for &candidate in &roles.qty_candidates {
        let mut score = 0.0;
        let mut used = 0usize;

        for r in start..=end {
            let len = sheet.number_at(r, length_col);
            let wid = sheet.number_at(r, width_col);
            let area = sheet.number_at(r, area_col);
            let qty = sheet.number_at(r, candidate);

            let piece_area = match (len, wid) {
                (Some(l), Some(w)) if l > 0.0 && w > 0.0 => l * w / 1e6,
                _ => continue,
            };
            let (Some(area), Some(qty)) = (area, qty) else {
                continue;
            };
            if area <= 0.0 || qty <= 0.0 {
                continue;
            }

            let expected = area / piece_area;
            if !expected.is_finite() || expected <= 0.0 {
                continue;
            }

            let rel = (qty - expected).abs() / expected.max(1.0);
            let int_penalty = (expected.round() - expected).abs().min(1.0);
            score += rel + INTEGER_PENALTY_WEIGHT * int_penalty;
            used += 1;
        }

        if used >= MIN_QTY_SAMPLE_ROWS {
            let avg = score / used as f64;
            if best.map_or(true, |(_, s)| avg < s) {
                best = Some((candidate, avg));
            }
        }
    }

    if let Some((winner, score)) = best {
        if roles.qty != Some(winner) {
            debug!(
                "qty column {} beats default {:?} (score {:.4})",
                winner, roles.qty, score
            );
        }
        roles.qty = Some(winner);
    }
}

/// Reconstruct the contextual fields of one table row
pub fn infer_row_context(sheet: &Worksheet, row: u32) -> RowContext {
    let Some(roles) = infer_columns(sheet, row) else {
        return RowContext::bare(row);
    };

    let text_of = |col: Option<u16>| -> Option<String> {
        let value = sheet.value_at(row, col?);
        if value.is_empty() {
            return None;
        }
        let text = value.effective_value().to_string();
        (!text.trim().is_empty()).then(|| text.trim().to_string())
    };
    let number_of = |col: Option<u16>| col.and_then(|c| sheet.number_at(row, c));

    RowContext {
        row,
        name: text_of(roles.name),
        qty: number_of(roles.qty),
        area_m2: number_of(roles.area),
        thickness: number_of(roles.thickness),
        length_mm: number_of(roles.length),
        width_mm: number_of(roles.width),
        roles: Some(roles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costplan_core::Workbook;
    use pretty_assertions::assert_eq;

    /// Parts table with an engineering quantity column and a real one;
    /// the area column agrees with the real quantity only.
    fn two_qty_workbook() -> Workbook {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Детали").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();

        let headers = [
            "Наименование",
            "Длина",
            "Ширина",
            "Кол-во (констр.)",
            "Кол-во факт",
            "Площадь, м2",
        ];
        for (c, h) in headers.iter().enumerate() {
            ws.set_value_at(1, c as u16, *h).unwrap();
        }

        // (len, wid, qty_eng, qty_real)
        let rows = [
            (600.0, 400.0, 7.0, 2.0),
            (800.0, 300.0, 9.0, 4.0),
            (500.0, 500.0, 3.0, 1.0),
            (1200.0, 450.0, 5.0, 2.0),
        ];
        for (i, (len, wid, qty_eng, qty_real)) in rows.iter().enumerate() {
            let r = 2 + i as u32;
            ws.set_value_at(r, 0, format!("Деталь {}", i + 1)).unwrap();
            ws.set_value_at(r, 1, *len).unwrap();
            ws.set_value_at(r, 2, *wid).unwrap();
            ws.set_value_at(r, 3, *qty_eng).unwrap();
            ws.set_value_at(r, 4, *qty_real).unwrap();
            ws.set_value_at(r, 5, len * wid * qty_real / 1e6).unwrap();
        }
        wb
    }

    #[test]
    fn test_find_header_row() {
        let wb = two_qty_workbook();
        let ws = wb.worksheet(0).unwrap();

        assert_eq!(find_header_row(ws, 4), Some(1));
        // Out of window
        assert_eq!(find_header_row(ws, 30), None);
        // Nothing above the header itself
        assert_eq!(find_header_row(ws, 1), None);
    }

    #[test]
    fn test_roles_from_header() {
        let wb = two_qty_workbook();
        let ws = wb.worksheet(0).unwrap();
        let roles = infer_columns(ws, 3).unwrap();

        assert_eq!(roles.header_row, 1);
        assert_eq!(roles.name, Some(0));
        assert_eq!(roles.length, Some(1));
        assert_eq!(roles.width, Some(2));
        assert_eq!(roles.qty_candidates, vec![3, 4]);
        assert_eq!(roles.area, Some(5));
    }

    #[test]
    fn test_qty_disambiguation_prefers_consistent_column() {
        let wb = two_qty_workbook();
        let ws = wb.worksheet(0).unwrap();
        let roles = infer_columns(ws, 3).unwrap();

        // The physically consistent column wins; here it coincides with
        // the last candidate, so rebuild with the columns swapped to
        // prove scoring, not order, decides.
        assert_eq!(roles.qty, Some(4));

        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Детали").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        let headers = [
            "Наименование",
            "Длина",
            "Ширина",
            "Кол-во факт",
            "Кол-во (констр.)",
            "Площадь, м2",
        ];
        for (c, h) in headers.iter().enumerate() {
            ws.set_value_at(1, c as u16, *h).unwrap();
        }
        let rows = [
            (600.0, 400.0, 2.0, 7.0),
            (800.0, 300.0, 4.0, 9.0),
            (500.0, 500.0, 1.0, 3.0),
            (1200.0, 450.0, 2.0, 5.0),
        ];
        for (i, (len, wid, qty_real, qty_eng)) in rows.iter().enumerate() {
            let r = 2 + i as u32;
            ws.set_value_at(r, 0, format!("Деталь {}", i + 1)).unwrap();
            ws.set_value_at(r, 1, *len).unwrap();
            ws.set_value_at(r, 2, *wid).unwrap();
            ws.set_value_at(r, 3, *qty_real).unwrap();
            ws.set_value_at(r, 4, *qty_eng).unwrap();
            ws.set_value_at(r, 5, len * wid * qty_real / 1e6).unwrap();
        }

        let roles = infer_columns(wb.worksheet(0).unwrap(), 3).unwrap();
        // Default pick would be the last candidate (4); scoring overrides it
        assert_eq!(roles.qty, Some(3));
    }

    #[test]
    fn test_row_context_fields() {
        let wb = two_qty_workbook();
        let ws = wb.worksheet(0).unwrap();
        let ctx = infer_row_context(ws, 3);

        assert_eq!(ctx.name.as_deref(), Some("Деталь 2"));
        assert_eq!(ctx.length_mm, Some(800.0));
        assert_eq!(ctx.width_mm, Some(300.0));
        assert_eq!(ctx.qty, Some(4.0));
        assert_eq!(ctx.area_m2, Some(800.0 * 300.0 * 4.0 / 1e6));
        // No thickness column in this table -> unknown, not zero
        assert_eq!(ctx.thickness, None);
    }

    #[test]
    fn test_no_header_yields_bare_context() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        wb.worksheet_mut(0)
            .unwrap()
            .set_value_at(5, 0, "just data")
            .unwrap();

        let ctx = infer_row_context(wb.worksheet(0).unwrap(), 5);
        assert_eq!(ctx.roles, None);
        assert_eq!(ctx.name, None);
        assert_eq!(ctx.qty, None);
    }
}
