//! Sheet-qualified references and range expansion
//!
//! The textual grammar accepted here (`D92`, `Sheet1!D92`, `'Sheet 1'!D92`,
//! any of those with a `:End` tail) is the one external format the engine
//! owns: anchor overrides typed by an operator come in through it, and
//! trace results serialize back out through it.
//!
//! Unqualified references resolve against an explicit `default_sheet`
//! argument. There is deliberately no ambient "active sheet" fallback; a
//! bare reference with no default in scope is a parse failure, not a
//! guess.

use crate::cell::{CellAddress, CellRange};
use std::fmt;

/// A cell reference resolved to a concrete sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullRef {
    /// Sheet name (case-sensitive)
    pub sheet: String,
    /// Cell coordinate within the sheet
    pub addr: CellAddress,
}

impl FullRef {
    /// Create a new sheet-qualified reference
    pub fn new<S: Into<String>>(sheet: S, addr: CellAddress) -> Self {
        Self {
            sheet: sheet.into(),
            addr,
        }
    }

    /// 1-based row number, as displayed
    pub fn row_display(&self) -> u32 {
        self.addr.row + 1
    }

    /// 1-based column number, as displayed
    pub fn col_display(&self) -> u32 {
        self.addr.col as u32 + 1
    }
}

impl fmt::Display for FullRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.addr)
    }
}

/// A rectangular range resolved to a concrete sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullRange {
    /// Sheet name (case-sensitive)
    pub sheet: String,
    /// The cell rectangle
    pub range: CellRange,
}

impl FullRange {
    /// Create a new sheet-qualified range
    pub fn new<S: Into<String>>(sheet: S, range: CellRange) -> Self {
        Self {
            sheet: sheet.into(),
            range,
        }
    }
}

impl fmt::Display for FullRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.range)
    }
}

/// A parsed reference: either a single cell or a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// A single cell
    Cell(FullRef),
    /// An inclusive rectangular range
    Range(FullRange),
}

impl RefTarget {
    /// The sheet the target resolves to
    pub fn sheet(&self) -> &str {
        match self {
            RefTarget::Cell(r) => &r.sheet,
            RefTarget::Range(r) => &r.sheet,
        }
    }

    /// Get the single-cell form, if this is not a range
    pub fn as_cell(&self) -> Option<&FullRef> {
        match self {
            RefTarget::Cell(r) => Some(r),
            RefTarget::Range(_) => None,
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Cell(r) => write!(f, "{}", r),
            RefTarget::Range(r) => write!(f, "{}", r),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{FullRange, FullRef, RefTarget};
    use serde::{Serialize, Serializer};

    // References serialize in their textual grammar, the form operators
    // and reports use.
    impl Serialize for FullRef {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl Serialize for FullRange {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl Serialize for RefTarget {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }
}

/// Split a reference into its optional sheet qualifier and cell part
///
/// Returns `None` when a qualifier is present but malformed (empty sheet
/// name, unterminated quote, stray quote in an unquoted name).
fn split_sheet(text: &str) -> Option<(Option<&str>, &str)> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix('\'') {
        // Quoted sheet name: 'Sheet 1'!D92
        let close = rest.find('\'')?;
        let sheet = &rest[..close];
        if sheet.is_empty() {
            return None;
        }
        let after = &rest[close + 1..];
        let cell = after.strip_prefix('!')?;
        return Some((Some(sheet), cell));
    }

    match text.find('!') {
        Some(pos) => {
            let sheet = &text[..pos];
            if sheet.is_empty() || sheet.contains('\'') {
                return None;
            }
            Some((Some(sheet), &text[pos + 1..]))
        }
        None => Some((None, text)),
    }
}

/// Parse a textual reference into a concrete target
///
/// `default_sheet` supplies the sheet for unqualified references; with
/// neither a qualifier nor a default the parse fails. The cell portion
/// must match the `[A-Z]{1,3}[0-9]+` grammar (case-insensitive,
/// `$`-anchors stripped), optionally extended with `:End`.
pub fn parse_ref(text: &str, default_sheet: Option<&str>) -> Option<RefTarget> {
    let (explicit, cell_part) = split_sheet(text)?;
    let sheet = explicit.or(default_sheet)?;
    let cell_part = cell_part.trim();

    if cell_part.contains(':') {
        let range = CellRange::parse(cell_part).ok()?;
        Some(RefTarget::Range(FullRange::new(sheet, range)))
    } else {
        let addr = CellAddress::parse(cell_part).ok()?;
        Some(RefTarget::Cell(FullRef::new(sheet, addr)))
    }
}

/// Parse a textual reference that must denote a single cell
pub fn parse_cell_ref(text: &str, default_sheet: Option<&str>) -> Option<FullRef> {
    match parse_ref(text, default_sheet)? {
        RefTarget::Cell(r) => Some(r),
        RefTarget::Range(_) => None,
    }
}

/// Normalize a textual reference to its canonical `Sheet!A1` form
///
/// Always re-resolves through the grammar; never assumes a previous
/// parse's shape.
pub fn to_full_ref(text: &str, default_sheet: Option<&str>) -> Option<String> {
    parse_ref(text, default_sheet).map(|t| t.to_string())
}

/// Expand a target into its single-cell references, row-major
///
/// A single cell expands to a one-element list; a range yields all its
/// cells with row *r* complete before row *r+1*, both endpoints
/// included.
pub fn expand_target(target: &RefTarget) -> Vec<FullRef> {
    match target {
        RefTarget::Cell(r) => vec![r.clone()],
        RefTarget::Range(r) => r
            .range
            .cells()
            .map(|addr| FullRef::new(r.sheet.clone(), addr))
            .collect(),
    }
}

/// Parse and expand a batch of raw reference tokens
///
/// Tokens that fail to parse are skipped: the inputs come from
/// arbitrarily authored formulas and a bad token means "not a
/// reference", not a fatal condition.
pub fn expand_all<I, S>(tokens: I, default_sheet: Option<&str>) -> Vec<FullRef>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for token in tokens {
        if let Some(target) = parse_ref(token.as_ref(), default_sheet) {
            out.extend(expand_target(&target));
        }
    }
    out
}
