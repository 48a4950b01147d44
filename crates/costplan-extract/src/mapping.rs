//! Auto-detected sheet mappings
//!
//! Older calculation workbooks keep a material dictionary, an overall
//! dimensions cell, and a parts table at loosely conventional spots.
//! These detectors locate them so the operator only has to correct the
//! mapping, not author it from scratch.

use std::collections::HashMap;

use costplan_core::{CellAddress, Worksheet};
use lazy_regex::regex;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DEFAULT_BOARD_THICKNESS_MM;

/// Latin x, Cyrillic х, asterisk, and the multiplication sign all appear
/// in the wild as the dimension separator
static DIMENSIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{3,4})\s*[*xх×]\s*(\d{3,4})\s*[*xх×]\s*(\d{3,4})").unwrap()
});

/// Location of the material dictionary block
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaterialDictMapping {
    /// First dictionary row (0-based)
    pub start_row: u32,
    /// Last dictionary row (0-based, inclusive)
    pub end_row: u32,
    /// Material name column
    pub name_col: u16,
    /// Price column
    pub price_col: u16,
    /// Waste-factor column
    pub waste_col: u16,
    /// Material id column
    pub id_col: u16,
}

/// Location of the parts table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DetailsTableMapping {
    /// Header row (0-based)
    pub header_row: u32,
    /// First data row (0-based)
    pub start_row: u32,
    /// Last data row (0-based, inclusive)
    pub end_row: u32,
    /// Part name column
    pub name_col: Option<u16>,
    /// Thickness / material-id column
    pub thickness_col: Option<u16>,
    /// Length column
    pub length_col: Option<u16>,
    /// Width column
    pub width_col: Option<u16>,
    /// Quantity column
    pub qty_col: Option<u16>,
}

/// Everything detected (or operator-supplied) about one sheet's layout
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SheetMapping {
    /// Material dictionary block, when found
    pub materials: Option<MaterialDictMapping>,
    /// Parts table, when found
    pub details: Option<DetailsTableMapping>,
    /// Cell holding a `1200x600x400`-style dimensions string
    pub dimensions_cell: Option<String>,
    /// Operator-supplied per-axis cells, used when no dimensions string exists
    pub width_cell: Option<String>,
    /// See `width_cell`
    pub depth_cell: Option<String>,
    /// See `width_cell`
    pub height_cell: Option<String>,
}

/// A material dictionary entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Material {
    /// Display name
    pub name: String,
    /// Price per unit area
    pub price: f64,
    /// Waste factor
    pub waste: f64,
}

/// A parts-table row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Part {
    /// Part name
    pub name: String,
    /// Material id as written in the table
    pub material_id: String,
    /// Resolved material name, empty when the id is unknown
    pub material: String,
    /// Length, mm
    pub length_mm: Option<f64>,
    /// Width, mm
    pub width_mm: Option<f64>,
    /// Thickness, mm
    pub thickness_mm: f64,
    /// Piece count
    pub qty: f64,
}

/// Overall product dimensions, mm
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Dimensions {
    /// Width
    pub width: Option<f64>,
    /// Depth
    pub depth: Option<f64>,
    /// Height
    pub height: Option<f64>,
}

/// Pull a thickness in mm out of a material id like "ЛДСП16" or "16мм"
pub fn extract_thickness(text: &str) -> Option<f64> {
    regex!(r"(\d{2})")
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

fn row_text_lower(sheet: &Worksheet, row: u32) -> String {
    sheet
        .row_cells(row)
        .filter_map(|(_, v)| v.as_text())
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detect the conventional blocks of a calculation sheet
pub fn auto_detect_mapping(sheet: &Worksheet) -> SheetMapping {
    let mut mapping = SheetMapping::default();

    // Material dictionary: a board-material keyword in column A with a
    // numeric id over in column F
    for row in 0..50 {
        let name = sheet
            .text_at(row, 0)
            .map(|t| t.to_lowercase())
            .unwrap_or_default();
        if !(name.contains("лдсп") || name.contains("мдф") || name.contains("дсп")) {
            continue;
        }
        if sheet.number_at(row, 5).is_some() {
            mapping.materials = Some(MaterialDictMapping {
                start_row: row,
                end_row: row + 9,
                name_col: 0,
                price_col: 1,
                waste_col: 2,
                id_col: 5,
            });
            break;
        }
    }

    // Overall dimensions: a WxDxH string somewhere in column A
    for row in 0..100 {
        let Some(text) = sheet.text_at(row, 0) else {
            continue;
        };
        if DIMENSIONS_RE.is_match(text) {
            mapping.dimensions_cell = Some(CellAddress::new(row, 0).to_a1_string());
            break;
        }
    }

    // Parts table: header row naming the part, its length and width
    for row in 0..100 {
        let text = row_text_lower(sheet, row);
        if !(text.contains("наимен") && text.contains("длина") && text.contains("ширина")) {
            continue;
        }

        let mut details = DetailsTableMapping {
            header_row: row,
            start_row: row + 1,
            end_row: row + 31,
            name_col: None,
            thickness_col: None,
            length_col: None,
            width_col: None,
            qty_col: None,
        };
        for (col, value) in sheet.row_cells(row) {
            let Some(cell_text) = value.as_text() else {
                continue;
            };
            let t = cell_text.to_lowercase();
            if t.contains("наимен") {
                details.name_col = Some(col);
            }
            if t.contains("тлщн") || t.contains("толщ") {
                details.thickness_col = Some(col);
            }
            if t.contains("длин") {
                details.length_col = Some(col);
            }
            if t.contains("ширин") {
                details.width_col = Some(col);
            }
            if t.contains("кол") {
                details.qty_col = Some(col);
            }
        }
        mapping.details = Some(details);
        break;
    }

    debug!(
        "auto-detected mapping on '{}': materials={} details={} dims={:?}",
        sheet.name(),
        mapping.materials.is_some(),
        mapping.details.is_some(),
        mapping.dimensions_cell
    );

    mapping
}

/// Read the material dictionary block
pub fn parse_material_dictionary(
    sheet: &Worksheet,
    mapping: &MaterialDictMapping,
) -> HashMap<String, Material> {
    let mut materials = HashMap::new();
    for row in mapping.start_row..=mapping.end_row {
        let Some(name) = sheet.text_at(row, mapping.name_col) else {
            continue;
        };
        let id = sheet
            .value_at(row, mapping.id_col)
            .effective_value()
            .to_string()
            .trim()
            .to_string();
        if id.is_empty() || name.trim().is_empty() {
            continue;
        }
        let price = sheet.number_at(row, mapping.price_col).unwrap_or(0.0);
        let waste = sheet.number_at(row, mapping.waste_col).unwrap_or(0.0);
        materials.insert(
            id,
            Material {
                name: name.trim().to_string(),
                price,
                waste,
            },
        );
    }
    materials
}

/// Read the parts table through a detected mapping
pub fn parse_part_rows(
    sheet: &Worksheet,
    details: &DetailsTableMapping,
    materials: &HashMap<String, Material>,
) -> Vec<Part> {
    let mut parts = Vec::new();
    for row in details.start_row..=details.end_row {
        let name = details
            .name_col
            .and_then(|c| sheet.text_at(row, c))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let Some(name) = name else {
            continue;
        };

        let material_id = details
            .thickness_col
            .map(|c| {
                sheet
                    .value_at(row, c)
                    .effective_value()
                    .to_string()
                    .trim()
                    .to_string()
            })
            .unwrap_or_default();
        let material = materials
            .get(&material_id)
            .map(|m| m.name.clone())
            .unwrap_or_default();

        parts.push(Part {
            length_mm: details.length_col.and_then(|c| sheet.number_at(row, c)),
            width_mm: details.width_col.and_then(|c| sheet.number_at(row, c)),
            thickness_mm: extract_thickness(&material_id).unwrap_or(DEFAULT_BOARD_THICKNESS_MM),
            qty: details
                .qty_col
                .and_then(|c| sheet.number_at(row, c))
                .unwrap_or(1.0),
            name,
            material_id,
            material,
        });
    }
    parts
}

/// Parse overall product dimensions
///
/// Prefers the detected `WxDxH` string; falls back to operator-supplied
/// per-axis cells.
pub fn parse_dimensions(sheet: &Worksheet, mapping: &SheetMapping) -> Dimensions {
    let mut dims = Dimensions::default();

    if let Some(cell) = &mapping.dimensions_cell {
        if let Ok(addr) = CellAddress::parse(cell) {
            if let Some(text) = sheet.text_at(addr.row, addr.col) {
                if let Some(caps) = DIMENSIONS_RE.captures(text) {
                    dims.width = caps[1].parse().ok();
                    dims.depth = caps[2].parse().ok();
                    dims.height = caps[3].parse().ok();
                }
            }
        }
    }

    let read_cell = |cell: &Option<String>| -> Option<f64> {
        let addr = CellAddress::parse(cell.as_deref()?).ok()?;
        sheet.number_at(addr.row, addr.col)
    };
    if dims.width.is_none() {
        dims.width = read_cell(&mapping.width_cell);
    }
    if dims.depth.is_none() {
        dims.depth = read_cell(&mapping.depth_cell);
    }
    if dims.height.is_none() {
        dims.height = read_cell(&mapping.height_cell);
    }

    dims
}
