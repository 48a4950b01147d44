//! Heuristic tuning constants
//!
//! Every threshold the extractors lean on lives here as a named,
//! overridable value so acceptance behavior is testable on its own.

/// Maximum recursion depth for the dependency tracer
pub const DEFAULT_MAX_TRACE_DEPTH: usize = 20;

/// How many rows above a data row to search for its header row
pub const HEADER_SEARCH_WINDOW: u32 = 10;

/// Half-width (in rows) of the sample used to disambiguate quantity columns
pub const QTY_SAMPLE_WINDOW: u32 = 20;

/// Minimum usable sample rows before a quantity candidate is scored
pub const MIN_QTY_SAMPLE_ROWS: usize = 3;

/// Weight of the "expected quantity should be an integer" penalty
pub const INTEGER_PENALTY_WEIGHT: f64 = 0.25;

/// Board thickness assumed when a table does not state one
pub const DEFAULT_BOARD_THICKNESS_MM: f64 = 16.0;

/// Acceptance band for the leaf-sum / anchor-value coverage ratio
///
/// A reconstruction whose coverage falls outside the band is still
/// returned, but marked not usable: rate-per-area figures derived from
/// it should not be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageBand {
    /// Lower acceptance bound (inclusive)
    pub min: f64,
    /// Upper acceptance bound (inclusive)
    pub max: f64,
}

impl CoverageBand {
    /// Near-exact agreement, for cross-checking traced leaf sums
    pub const TIGHT: CoverageBand = CoverageBand {
        min: 0.99,
        max: 1.01,
    };

    /// Default band for structured board-material tables
    pub const STANDARD: CoverageBand = CoverageBand {
        min: 0.95,
        max: 1.05,
    };

    /// Wider band for loosely structured templates
    pub const RELAXED: CoverageBand = CoverageBand {
        min: 0.85,
        max: 1.15,
    };

    /// Check whether a coverage ratio falls inside the band
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

impl Default for CoverageBand {
    fn default() -> Self {
        CoverageBand::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_contains() {
        assert!(CoverageBand::STANDARD.contains(1.0));
        assert!(CoverageBand::STANDARD.contains(0.95));
        assert!(CoverageBand::STANDARD.contains(1.05));
        assert!(!CoverageBand::STANDARD.contains(0.94));
        assert!(!CoverageBand::STANDARD.contains(1.06));

        assert!(CoverageBand::RELAXED.contains(0.9));
        assert!(!CoverageBand::TIGHT.contains(0.9));
    }
}
