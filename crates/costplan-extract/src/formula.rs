//! Formula reference scanning
//!
//! Nothing here parses arithmetic. The extractors only need the
//! reference *topology* of a formula, so these are scans for anything
//! matching the reference grammar, wherever it occurs in the text.
//! Operators, function names, and literals pass through unrecognized.

use costplan_core::CellRange;
use lazy_regex::regex;

/// Extract every reference token from a formula's text
///
/// Recognizes sheet-qualified tokens (`'Лист 2'!B3`, `Data!A1:A9`) and
/// bare tokens (`D92`, `A1:B2`). Tokens come back in first-appearance
/// order with duplicates preserved; callers deduplicate as needed.
pub fn extract_refs(formula: &str) -> Vec<String> {
    let body = formula.trim().trim_start_matches('=');
    regex!(r"(?:(?:'[^']+'|\w+)!)?\$?[A-Za-z]{1,3}\$?[0-9]+(?::\$?[A-Za-z]{1,3}\$?[0-9]+)?")
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract bare A1-style cell tokens, sheet qualifiers ignored
///
/// The narrow scanner the board-table path uses when every term is
/// known to live on the anchor's own sheet. Output is uppercased with
/// `$` anchors stripped.
pub fn extract_bare_refs(formula: &str) -> Vec<String> {
    let clean = formula.to_uppercase().replace('$', "");
    regex!(r"[A-Z]{1,3}[0-9]+")
        .find_iter(&clean)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Expand the argument list of a single flat `SUM(...)` call
///
/// Returns the individual cell tokens of the call's comma- or
/// semicolon-separated arguments, ranges expanded row-major. Empty when
/// the formula holds no `SUM` call, the signal that a term cell is not
/// a flat sum and should be treated as a leaf itself.
pub fn sum_refs(formula: &str) -> Vec<String> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(caps) = regex!(r"(?i)sum\(([^)]+)\)").captures(&compact) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for part in caps[1].split([',', ';']) {
        let cleaned = part.replace('$', "").to_uppercase();
        if cleaned.is_empty() {
            continue;
        }
        if let Ok(range) = CellRange::parse(&cleaned) {
            out.extend(range.cells().map(|addr| addr.to_a1_string()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_refs_order_and_duplicates() {
        let refs = extract_refs("=M92+O92+M92");
        assert_eq!(refs, vec!["M92", "O92", "M92"]);
    }

    #[test]
    fn test_extract_refs_mixed_shapes() {
        let refs = extract_refs("='Лист 2'!B3*2+Data!A1:A9-C4");
        assert_eq!(refs, vec!["'Лист 2'!B3", "Data!A1:A9", "C4"]);
    }

    #[test]
    fn test_extract_refs_ignores_plain_arithmetic() {
        assert!(extract_refs("=1+2*3").is_empty());
        assert!(extract_refs("").is_empty());
    }

    #[test]
    fn test_extract_refs_with_anchors() {
        let refs = extract_refs("=$M$10+O$10");
        assert_eq!(refs, vec!["$M$10", "O$10"]);
    }

    #[test]
    fn test_extract_bare_refs() {
        let refs = extract_bare_refs("=m10+$o$10");
        assert_eq!(refs, vec!["M10", "O10"]);
    }

    #[test]
    fn test_sum_refs_plain_list() {
        let refs = sum_refs("=SUM(M1;M3,M5)");
        assert_eq!(refs, vec!["M1", "M3", "M5"]);
    }

    #[test]
    fn test_sum_refs_expands_ranges() {
        let refs = sum_refs("=SUM(M1:M4)");
        assert_eq!(refs, vec!["M1", "M2", "M3", "M4"]);

        let refs = sum_refs("= sum ( a1:b2 )");
        assert_eq!(refs, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_sum_refs_not_a_flat_sum() {
        assert!(sum_refs("=M10+O10").is_empty());
        // SUMIF is not a flat SUM call
        assert!(sum_refs("=SUMIF(A1:A9,\">0\")").is_empty());
        assert!(sum_refs("=ROUND(1,2)").is_empty());
    }
}
