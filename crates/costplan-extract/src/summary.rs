//! One-call extraction summary
//!
//! Resolves anchors, reads every base value, and reconstructs the board
//! and edge-banding breakdowns: the single entry point interactive
//! callers use after loading a workbook.

use costplan_core::Workbook;

use crate::breakdown::{build_breakdown, Breakdown, BreakdownOptions};
use crate::config::CoverageBand;
use crate::label::{apply_overrides, read_anchor_value, resolve_anchors, AnchorKey, AnchorMap};

/// Cached numeric values behind the resolved anchors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BaseValues {
    /// Total direct cost
    pub total_cost: Option<f64>,
    /// Weight, kg
    pub weight: Option<f64>,
    /// Labor intensity, person-hours
    pub labor_hours: Option<f64>,
    /// Board material cost
    pub board: Option<f64>,
    /// Edge banding cost
    pub edge: Option<f64>,
    /// Plastic facing cost
    pub plastic: Option<f64>,
    /// Fabric cost
    pub fabric: Option<f64>,
    /// Imported hardware cost
    pub hardware_imported: Option<f64>,
    /// Local hardware cost
    pub hardware_local: Option<f64>,
    /// Packaging cost
    pub packaging: Option<f64>,
    /// Direct labor cost
    pub labor: Option<f64>,
}

/// Options for [`build_summary`]
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Operator-supplied anchor overrides (fill missing keys only)
    pub overrides: Vec<(AnchorKey, String)>,
    /// Acceptance band for the board breakdown
    pub board_band: CoverageBand,
    /// Acceptance band for the edge breakdown; wider by default because
    /// edge tables are the least structured of the templates
    pub edge_band: CoverageBand,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            board_band: CoverageBand::STANDARD,
            edge_band: CoverageBand::RELAXED,
        }
    }
}

/// Full extraction result for one workbook
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Summary {
    /// Resolved anchors
    pub anchors: AnchorMap,
    /// Cached values behind the anchors
    pub base_values: BaseValues,
    /// Board-material breakdown, when its anchor resolved
    pub board: Option<Breakdown>,
    /// Edge-banding breakdown, when its anchor resolved
    pub edge: Option<Breakdown>,
}

/// Resolve anchors and reconstruct the standard breakdowns
pub fn build_summary(workbook: &Workbook, options: &SummaryOptions) -> Summary {
    let mut anchors = resolve_anchors(workbook);
    apply_overrides(
        &mut anchors,
        options.overrides.iter().map(|(k, v)| (*k, v.as_str())),
        None,
    );

    let value_of = |key: AnchorKey| -> Option<f64> {
        anchors.get(&key).and_then(|r| read_anchor_value(workbook, r))
    };
    let base_values = BaseValues {
        total_cost: value_of(AnchorKey::TotalCost),
        weight: value_of(AnchorKey::Weight),
        labor_hours: value_of(AnchorKey::LaborHours),
        board: value_of(AnchorKey::BoardCost),
        edge: value_of(AnchorKey::EdgeCost),
        plastic: value_of(AnchorKey::PlasticCost),
        fabric: value_of(AnchorKey::FabricCost),
        hardware_imported: value_of(AnchorKey::HardwareImported),
        hardware_local: value_of(AnchorKey::HardwareLocal),
        packaging: value_of(AnchorKey::PackagingCost),
        labor: value_of(AnchorKey::LaborCost),
    };

    let breakdown_for = |key: AnchorKey, band: CoverageBand| -> Option<Breakdown> {
        let anchor = anchors.get(&key)?;
        Some(build_breakdown(
            workbook,
            &anchor.to_string(),
            &BreakdownOptions {
                coverage_band: band,
                default_sheet: None,
            },
        ))
    };

    let board = breakdown_for(AnchorKey::BoardCost, options.board_band);
    let edge = breakdown_for(AnchorKey::EdgeCost, options.edge_band);

    Summary {
        anchors,
        base_values,
        board,
        edge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_over_board_workbook() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Плитн. материалы").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();

        ws.set_value_at(0, 0, "Бок").unwrap();
        ws.set_value_at(0, 12, 100.0).unwrap();
        ws.set_formula_with_cached("M4", "=SUM(M1:M3)", 100.0).unwrap();

        ws.set_value("A6", "Вес, кг").unwrap();
        ws.set_value("B6", 35.0).unwrap();
        ws.set_value("A7", "Стоимость ДСП").unwrap();
        ws.set_formula_with_cached("B7", "=M4", 100.0).unwrap();
        ws.set_value("A8", "Прямые затраты").unwrap();
        ws.set_value("B8", 180.0).unwrap();

        let summary = build_summary(&wb, &SummaryOptions::default());

        assert_eq!(summary.base_values.weight, Some(35.0));
        assert_eq!(summary.base_values.board, Some(100.0));
        assert_eq!(summary.base_values.total_cost, Some(180.0));
        assert_eq!(summary.base_values.edge, None);

        let board = summary.board.unwrap();
        assert_eq!(board.leaf_sum, 100.0);
        assert_eq!(board.coverage, Some(1.0));
        assert!(board.usable);

        assert!(summary.edge.is_none());
    }

    #[test]
    fn test_summary_overrides_fill_missing_anchor() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("S").unwrap();
        let ws = wb.worksheet_mut(0).unwrap();
        ws.set_value("A1", "Стоимость ДСП").unwrap();
        ws.set_value("B1", 50.0).unwrap();
        ws.set_value("D4", 7.5).unwrap();

        let summary = build_summary(
            &wb,
            &SummaryOptions {
                overrides: vec![(AnchorKey::PackagingCost, "S!D4".to_string())],
                ..Default::default()
            },
        );

        assert_eq!(summary.base_values.packaging, Some(7.5));
        assert_eq!(summary.base_values.board, Some(50.0));
    }
}
