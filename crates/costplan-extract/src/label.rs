//! Label normalization and anchor resolution
//!
//! Summary totals sit next to free-text labels that vary wildly between
//! authors: synonyms, extra punctuation, `ё`/`е` spelling, stray `=`
//! signs. Matching happens on an aggressively normalized form of the
//! label text.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use costplan_core::{parse_cell_ref, CellAddress, FullRef, Workbook, Worksheet};
use log::debug;
use once_cell::sync::Lazy;

/// Normalize label text for fuzzy matching
///
/// Lowercases, folds `ё` to `е`, drops `=` and whitespace, and keeps
/// only Latin letters, Cyrillic letters, and digits, so that
/// `"Трудоёмкость, человеко-часы ="` and `"трудоемкость человекочасы"`
/// compare equal.
pub fn normalize_label(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .filter(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || ('а'..='я').contains(c))
        .collect()
}

/// The named business quantities the anchor locator resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorKey {
    /// Total direct cost of the product
    TotalCost,
    /// Product weight, kg
    Weight,
    /// Labor intensity, person-hours
    LaborHours,
    /// Board material (chipboard) cost
    BoardCost,
    /// Edge banding cost
    EdgeCost,
    /// Plastic facing cost
    PlasticCost,
    /// Fabric cost
    FabricCost,
    /// Imported hardware cost
    HardwareImported,
    /// Locally sourced hardware cost
    HardwareLocal,
    /// Packaging cost
    PackagingCost,
    /// Direct labor cost
    LaborCost,
}

impl AnchorKey {
    /// All keys, in report order
    pub const ALL: [AnchorKey; 11] = [
        AnchorKey::TotalCost,
        AnchorKey::Weight,
        AnchorKey::LaborHours,
        AnchorKey::BoardCost,
        AnchorKey::EdgeCost,
        AnchorKey::PlasticCost,
        AnchorKey::FabricCost,
        AnchorKey::HardwareImported,
        AnchorKey::HardwareLocal,
        AnchorKey::PackagingCost,
        AnchorKey::LaborCost,
    ];

    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorKey::TotalCost => "total_cost",
            AnchorKey::Weight => "weight",
            AnchorKey::LaborHours => "labor_hours",
            AnchorKey::BoardCost => "board_cost",
            AnchorKey::EdgeCost => "edge_cost",
            AnchorKey::PlasticCost => "plastic_cost",
            AnchorKey::FabricCost => "fabric_cost",
            AnchorKey::HardwareImported => "hardware_imported",
            AnchorKey::HardwareLocal => "hardware_local",
            AnchorKey::PackagingCost => "packaging_cost",
            AnchorKey::LaborCost => "labor_cost",
        }
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnchorKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown anchor key '{}'", s))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for AnchorKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Resolved anchors: at most one cell per key
pub type AnchorMap = BTreeMap<AnchorKey, FullRef>;

/// Normalized marker identifying the board-material sheet by name
const BOARD_SHEET_MARKER: &str = "плитнматериал";

/// The label vocabulary, normalized and sorted longest-first so a short
/// key never shadows a more specific one ("стоимость..." variants).
static LABELS: Lazy<Vec<(String, AnchorKey)>> = Lazy::new(|| {
    let raw: [(&str, AnchorKey); 12] = [
        ("Вес, кг", AnchorKey::Weight),
        ("Трудоемкость", AnchorKey::LaborHours),
        ("Стоимость ДСП", AnchorKey::BoardCost),
        ("Стоимость кромки", AnchorKey::EdgeCost),
        ("Стоимость пластика", AnchorKey::PlasticCost),
        ("Стоимость ткани", AnchorKey::FabricCost),
        ("Стоимость фурнитуры имп.", AnchorKey::HardwareImported),
        ("Стоимость фурнитуры отч.", AnchorKey::HardwareLocal),
        ("Стоимость упаковки", AnchorKey::PackagingCost),
        ("Труд рабочих", AnchorKey::LaborCost),
        // Two common phrasings for the grand total
        ("Прямые затраты", AnchorKey::TotalCost),
        ("Стоимость расчета суммарно", AnchorKey::TotalCost),
    ];
    let mut labels: Vec<(String, AnchorKey)> = raw
        .iter()
        .map(|(text, key)| (normalize_label(text), *key))
        .collect();
    labels.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    labels
});

/// Resolve the anchor cells of a workbook by fuzzy label matching
///
/// Scans the first column of every sheet row-major for label text; on a
/// match the value cell is the right-adjacent cell, accepted only when
/// non-empty. The sheet whose name carries the board-material marker is
/// scanned first; authoritative totals conventionally live next to the
/// board table. Once a key resolves it is never overwritten.
pub fn resolve_anchors(workbook: &Workbook) -> AnchorMap {
    let mut ordered: Vec<&Worksheet> = Vec::with_capacity(workbook.sheet_count());
    let preferred = workbook
        .worksheets()
        .find(|ws| normalize_label(ws.name()).contains(BOARD_SHEET_MARKER));
    if let Some(p) = preferred {
        ordered.push(p);
    }
    ordered.extend(
        workbook
            .worksheets()
            .filter(|ws| preferred.map_or(true, |p| !std::ptr::eq(*ws, p))),
    );

    let mut anchors = AnchorMap::new();
    for ws in ordered {
        scan_sheet_anchors(ws, &mut anchors);
    }
    anchors
}

fn scan_sheet_anchors(sheet: &Worksheet, anchors: &mut AnchorMap) {
    let Some(used) = sheet.used_range() else {
        return;
    };
    if used.start.col > 0 {
        return; // first column has no content on this sheet
    }

    for row in used.start.row..=used.end.row {
        let Some(text) = sheet.text_at(row, 0) else {
            continue;
        };
        let normalized = normalize_label(text);
        if normalized.is_empty() {
            continue;
        }

        for (label, key) in LABELS.iter() {
            if anchors.contains_key(key) {
                continue;
            }
            if normalized == *label
                || normalized.starts_with(label.as_str())
                || normalized.contains(label.as_str())
            {
                // Candidate value cell sits immediately to the right
                if !sheet.value_at(row, 1).is_empty() {
                    let anchor = FullRef::new(sheet.name(), CellAddress::new(row, 1));
                    debug!("anchor {} resolved to {}", key, anchor);
                    anchors.insert(*key, anchor);
                }
                break;
            }
        }
    }
}

/// Fill missing anchors from operator-supplied textual overrides
///
/// Overrides never replace an auto-resolved anchor; they only fill
/// gaps. Unqualified refs resolve against `default_sheet`, falling back
/// to the sheet of an already-resolved total/board/edge anchor.
pub fn apply_overrides<'a, I>(anchors: &mut AnchorMap, overrides: I, default_sheet: Option<&str>)
where
    I: IntoIterator<Item = (AnchorKey, &'a str)>,
{
    let fallback: Option<String> = default_sheet.map(str::to_string).or_else(|| {
        [
            AnchorKey::TotalCost,
            AnchorKey::BoardCost,
            AnchorKey::EdgeCost,
        ]
        .iter()
        .find_map(|k| anchors.get(k).map(|r| r.sheet.clone()))
    });

    for (key, raw) in overrides {
        let raw = raw.trim();
        if raw.is_empty() || anchors.contains_key(&key) {
            continue;
        }
        match parse_cell_ref(raw, fallback.as_deref()) {
            Some(r) => {
                debug!("anchor {} overridden to {}", key, r);
                anchors.insert(key, r);
            }
            None => log::warn!("ignoring unparsable override for {}: '{}'", key, raw),
        }
    }
}

/// Read the cached numeric value behind an anchor, if any
pub fn read_anchor_value(workbook: &Workbook, anchor: &FullRef) -> Option<f64> {
    let sheet = workbook.worksheet_by_name(&anchor.sheet)?;
    sheet.number_at(anchor.addr.row, anchor.addr.col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_label_equivalence() {
        assert_eq!(
            normalize_label("Трудоёмкость, человеко-часы="),
            normalize_label("трудоемкость человекочасы")
        );
        assert_eq!(normalize_label("Вес, кг ="), "вескг");
        assert_eq!(normalize_label("  Qty / шт.  "), "qtyшт");
        assert_eq!(normalize_label("---"), "");
    }

    #[test]
    fn test_anchor_key_round_trip() {
        for key in AnchorKey::ALL {
            assert_eq!(key.as_str().parse::<AnchorKey>().unwrap(), key);
        }
        assert!("bogus".parse::<AnchorKey>().is_err());
    }

    fn workbook_with_totals() -> Workbook {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Расчет").unwrap();
        wb.add_worksheet_with_name("Плитн. материалы").unwrap();

        // A decoy total on the first sheet in file order
        let calc = wb.worksheet_by_name_mut("Расчет").unwrap();
        calc.set_value("A5", "Прямые затраты =").unwrap();
        calc.set_value("B5", 111.0).unwrap();

        // The authoritative totals next to the board table
        let board = wb.worksheet_by_name_mut("Плитн. материалы").unwrap();
        board.set_value("A3", "Вес, кг").unwrap();
        board.set_value("B3", 42.5).unwrap();
        board.set_value("A7", "Прямые затраты").unwrap();
        board.set_formula_with_cached("B7", "=M7+O7", 999.0).unwrap();
        board.set_value("A9", "Стоимость ДСП").unwrap();
        board.set_value("B9", 500.0).unwrap();

        wb
    }

    #[test]
    fn test_board_sheet_scanned_first() {
        let wb = workbook_with_totals();
        let anchors = resolve_anchors(&wb);

        // The board-material sheet wins over file order
        assert_eq!(
            anchors.get(&AnchorKey::TotalCost).unwrap().to_string(),
            "Плитн. материалы!B7"
        );
        assert_eq!(
            anchors.get(&AnchorKey::Weight).unwrap().to_string(),
            "Плитн. материалы!B3"
        );
        assert_eq!(
            anchors.get(&AnchorKey::BoardCost).unwrap().to_string(),
            "Плитн. материалы!B9"
        );
    }

    #[test]
    fn test_label_without_value_cell_is_skipped() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        ws.set_value("A1", "Стоимость упаковки").unwrap();
        // B1 left empty -> no anchor

        let anchors = resolve_anchors(&wb);
        assert!(anchors.get(&AnchorKey::PackagingCost).is_none());
    }

    #[test]
    fn test_longest_label_checked_first() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        // Matches both "стоимостьфурнитурыимп" and (by contains) nothing
        // shorter thanks to longest-first ordering
        ws.set_value("A1", "Стоимость фурнитуры имп., руб").unwrap();
        ws.set_value("B1", 77.0).unwrap();

        let anchors = resolve_anchors(&wb);
        assert_eq!(
            anchors.get(&AnchorKey::HardwareImported).unwrap().to_string(),
            "S!B1"
        );
    }

    #[test]
    fn test_apply_overrides_fills_only_missing() {
        let wb = workbook_with_totals();
        let mut anchors = resolve_anchors(&wb);

        apply_overrides(
            &mut anchors,
            [
                (AnchorKey::TotalCost, "Z99"),          // already resolved, ignored
                (AnchorKey::EdgeCost, "C12"),           // bare, resolves via total's sheet
                (AnchorKey::FabricCost, "Other!D4"),    // qualified
                (AnchorKey::PlasticCost, "not a ref"),  // unparsable, dropped
            ],
            None,
        );

        assert_eq!(
            anchors.get(&AnchorKey::TotalCost).unwrap().to_string(),
            "Плитн. материалы!B7"
        );
        assert_eq!(
            anchors.get(&AnchorKey::EdgeCost).unwrap().to_string(),
            "Плитн. материалы!C12"
        );
        assert_eq!(
            anchors.get(&AnchorKey::FabricCost).unwrap().to_string(),
            "Other!D4"
        );
        assert!(anchors.get(&AnchorKey::PlasticCost).is_none());
    }

    #[test]
    fn test_read_anchor_value() {
        let wb = workbook_with_totals();
        let anchors = resolve_anchors(&wb);

        let total = anchors.get(&AnchorKey::TotalCost).unwrap();
        assert_eq!(read_anchor_value(&wb, total), Some(999.0));

        let missing = FullRef::new("Nope", CellAddress::new(0, 0));
        assert_eq!(read_anchor_value(&wb, &missing), None);
    }
}
