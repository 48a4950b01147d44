//! Dependency tracing
//!
//! Unwinds a formula's reference graph down to leaf cells: cells that
//! hold no formula of their own. Visited tracking and the depth cap
//! bound the walk even over cyclic or densely cross-referenced sheets;
//! hitting either limit is silent termination, not an error.

use ahash::AHashSet;
use costplan_core::{expand_all, parse_cell_ref, to_full_ref, FullRef, Workbook};
use log::debug;

use crate::config::DEFAULT_MAX_TRACE_DEPTH;
use crate::formula::extract_refs;

/// A terminal cell reached by the trace
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceLeaf {
    /// The leaf cell
    pub reference: FullRef,
    /// Numeric value of the cell (0 when unparsable or missing)
    pub value: f64,
}

/// Diagnostic record of one visited reference and its direct children
///
/// The tree is a side artifact for inspection; the leaf list is the
/// authoritative output.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceNode {
    /// The visited reference, in canonical `Sheet!A1` form
    pub reference: String,
    /// Direct children (formula references), canonical form
    pub children: Vec<String>,
}

/// Output of a trace: leaves plus the diagnostic node list
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceResult {
    /// Leaf cells, in discovery order
    pub leaves: Vec<TraceLeaf>,
    /// One node per visited reference
    pub tree: Vec<TraceNode>,
}

impl TraceResult {
    /// Sum of all leaf values
    pub fn leaf_sum(&self) -> f64 {
        self.leaves.iter().map(|l| l.value).sum()
    }
}

/// Tuning for a trace run
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// Maximum recursion depth before the walk stops silently
    pub max_depth: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_TRACE_DEPTH,
        }
    }
}

/// Trace a root reference down to its leaf cells
///
/// `default_sheet` resolves an unqualified root; child references are
/// always qualified by the sheet of the formula that mentions them.
pub fn trace_leaves(
    workbook: &Workbook,
    root: &str,
    default_sheet: Option<&str>,
    options: &TraceOptions,
) -> TraceResult {
    let mut visited = AHashSet::new();
    trace_leaves_with_visited(workbook, root, default_sheet, options, &mut visited)
}

/// Trace with a caller-owned visited set
///
/// Sharing one set across calls deliberately suppresses re-visiting
/// references an earlier trace already consumed; independent traces
/// should each pass a fresh set.
pub fn trace_leaves_with_visited(
    workbook: &Workbook,
    root: &str,
    default_sheet: Option<&str>,
    options: &TraceOptions,
    visited: &mut AHashSet<String>,
) -> TraceResult {
    let mut result = TraceResult::default();

    let Some(full) = to_full_ref(root, default_sheet) else {
        return result;
    };
    walk(workbook, &full, 0, options.max_depth, visited, &mut result);

    debug!(
        "trace of {} visited {} refs, {} leaves",
        full,
        result.tree.len(),
        result.leaves.len()
    );
    result
}

fn walk(
    workbook: &Workbook,
    full: &str,
    depth: usize,
    max_depth: usize,
    visited: &mut AHashSet<String>,
    result: &mut TraceResult,
) {
    if depth > max_depth || visited.contains(full) {
        return;
    }
    visited.insert(full.to_string());

    let Some(fr) = parse_cell_ref(full, None) else {
        return;
    };
    let Some(sheet) = workbook.worksheet_by_name(&fr.sheet) else {
        return;
    };

    let cell = sheet.value_at(fr.addr.row, fr.addr.col);
    let mut node = TraceNode {
        reference: full.to_string(),
        children: Vec::new(),
    };

    let refs = cell.formula_body().map(extract_refs).unwrap_or_default();
    if refs.is_empty() {
        // Leaf: no formula, or a formula with no references in it.
        // Missing and unparsable cells count as zero-valued leaves:
        // an empty cell inside a summed range is still topology.
        result.leaves.push(TraceLeaf {
            reference: fr,
            value: cell.as_number().unwrap_or(0.0),
        });
    } else {
        // Children inherit the sheet of the formula that names them
        for child in expand_all(&refs, Some(&fr.sheet)) {
            let child_text = child.to_string();
            node.children.push(child_text.clone());
            walk(workbook, &child_text, depth + 1, max_depth, visited, result);
        }
    }

    result.tree.push(node);
}
