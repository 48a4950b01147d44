//! Cell value types

use std::fmt;

/// Represents the value stored in a cell
///
/// The grid is read-only input produced elsewhere; a formula's cached
/// value is whatever the producing engine last computed. The extractors
/// never re-derive it arithmetically.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell (no value)
    Empty,

    /// Numeric value
    Number(f64),

    /// Text value
    Text(String),

    /// Formula with cached result
    Formula {
        /// Original formula text (e.g., "=SUM(A1:A10)")
        text: String,
        /// Last computed value, if the producer stored one
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new formula value without a cached result
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached: None,
        }
    }

    /// Create a new formula value with a cached result
    pub fn formula_with_cached<S: Into<String>>(text: S, cached: CellValue) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached: Some(Box::new(cached)),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    ///
    /// Flat workbook exports sometimes store formulas as plain text
    /// starting with `=`; those count too.
    pub fn is_formula(&self) -> bool {
        self.formula_body().is_some()
    }

    /// Try to get the value as a number
    ///
    /// Follows a formula's cached value, and coerces text through
    /// [`parse_number`]: sheets authored by hand frequently hold
    /// numbers as strings with spaces and decimal commas.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Formula {
                cached: Some(v), ..
            } => v.as_number(),
            _ => None,
        }
    }

    /// Try to get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Formula {
                cached: Some(v), ..
            } => v.as_text(),
            _ => None,
        }
    }

    /// Get the formula body (without the leading `=`), if any
    ///
    /// A Text cell whose trimmed content starts with `=` is treated as a
    /// formula the producer failed to tag.
    pub fn formula_body(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => {
                let t = text.trim();
                let t = t.strip_prefix('=').unwrap_or(t);
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            }
            CellValue::Text(s) => {
                let t = s.trim();
                t.strip_prefix('=').filter(|rest| !rest.is_empty())
            }
            _ => None,
        }
    }

    /// Get the effective value (cached value for formulas, value otherwise)
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached: Some(v), ..
            } => v.effective_value(),
            _ => self,
        }
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Formula { .. } => "formula",
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Formula {
                cached: Some(v), ..
            } => write!(f, "{}", v),
            CellValue::Formula { text, .. } => write!(f, "{}", text),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Parse a number out of irregular spreadsheet text
///
/// Strips all whitespace (including no-break thousands separators) and
/// maps decimal commas to dots before parsing. Returns `None` for
/// anything that does not come out as a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(3.14), CellValue::Number(3.14));

        let s = CellValue::from("hello");
        assert_eq!(s.as_text(), Some("hello"));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(CellValue::Number(42.0).as_number(), Some(42.0));
        assert_eq!(CellValue::Empty.as_number(), None);

        // Text coercion with decimal comma and grouping spaces
        assert_eq!(CellValue::from("1 234,5").as_number(), Some(1234.5));
        assert_eq!(CellValue::from("hello").as_number(), None);

        // Formula follows cached value
        let f = CellValue::formula_with_cached("=B1*2", CellValue::Number(10.0));
        assert_eq!(f.as_number(), Some(10.0));
        assert_eq!(CellValue::formula("=B1*2").as_number(), None);
    }

    #[test]
    fn test_formula_body() {
        let f = CellValue::formula("=SUM(A1:A10)");
        assert_eq!(f.formula_body(), Some("SUM(A1:A10)"));

        // Producers that strip the '=' themselves
        let f = CellValue::formula("SUM(A1:A10)");
        assert_eq!(f.formula_body(), Some("SUM(A1:A10)"));

        // Text cell carrying a formula
        let t = CellValue::from(" =C3+C4 ");
        assert_eq!(t.formula_body(), Some("C3+C4"));
        assert!(t.is_formula());

        assert_eq!(CellValue::from("plain").formula_body(), None);
        assert_eq!(CellValue::Number(1.0).formula_body(), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("3,5"), Some(3.5));
        assert_eq!(parse_number("1 234 567,89"), Some(1234567.89));
        assert_eq!(parse_number("\u{a0}12\u{a0}000"), Some(12000.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("  "), None);
        assert_eq!(parse_number("12x"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}
