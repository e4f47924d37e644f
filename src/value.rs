use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// The value a column accessor extracts from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date into a
    /// `Date` value, falling back to `Text`.
    pub fn date_or_text(s: &str) -> Self {
        match parse_date(s) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Text(s.to_string()),
        }
    }

    /// Null and NaN count as missing; they render empty and sort last.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Text form used by the global filter and the clipboard.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Kind rank for ordering mixed columns: bools, numbers, dates (including
    /// text that parses as one), other text, then null.
    fn rank(&self) -> (u8, Option<DateTime<Utc>>) {
        match self {
            CellValue::Bool(_) => (0, None),
            CellValue::Number(_) => (1, None),
            CellValue::Date(d) => (2, Some(*d)),
            CellValue::Text(s) => match parse_date(s) {
                Some(d) => (2, Some(d)),
                None => (3, None),
            },
            CellValue::Null => (4, None),
        }
    }

    /// Ascending total order. Values of different kinds order by kind rank,
    /// values of the same kind natively.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        use CellValue::*;
        let (ra, da) = self.rank();
        let (rb, db) = other.rank();
        ra.cmp(&rb).then_with(|| match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Text(a), Text(b)) if ra == 3 => collate(a, b),
            _ => da.cmp(&db),
        })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
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

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

// Integral numbers print without a fraction so "250000" matches a search for "250000".
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// Case folded comparison with the exact text as tie break.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(CellValue::Number(250000.0).to_text(), "250000");
        assert_eq!(CellValue::Number(2.5).to_text(), "2.5");
        assert_eq!(CellValue::Null.to_text(), "");
    }

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert!(parse_date("2024-01-20T10:30:00Z").is_some());
        assert!(parse_date("2024-01-20").is_some());
        assert!(parse_date("PAY-001").is_none());
        assert!(matches!(CellValue::date_or_text("2024-01-20"), CellValue::Date(_)));
    }

    #[test]
    fn text_compares_case_folded() {
        let a = CellValue::text("apple");
        let b = CellValue::text("Banana");
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn text_dates_compare_chronologically() {
        let a = CellValue::text("2024-01-09T08:45:00Z");
        let b = CellValue::text("2024-01-10T13:20:00Z");
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn mixed_kinds_order_by_kind_first() {
        let ten = CellValue::Number(10.0);
        let nine = CellValue::Number(9.0);
        let five = CellValue::text("5");
        assert_eq!(ten.compare(&nine), Ordering::Greater);
        assert_eq!(nine.compare(&five), Ordering::Less);
        assert_eq!(five.compare(&ten), Ordering::Greater);

        let early = CellValue::text("2024-01-01");
        let word = CellValue::text("m");
        let late = CellValue::Date(parse_date("2024-02-01").unwrap());
        assert_eq!(early.compare(&late), Ordering::Less);
        assert_eq!(late.compare(&word), Ordering::Less);
        assert_eq!(early.compare(&word), Ordering::Less);
    }

    #[test]
    fn utc_dates_keep_the_z_suffix() {
        let d = CellValue::date_or_text("2024-01-20T10:30:00Z");
        assert_eq!(d.to_text(), "2024-01-20T10:30:00Z");
    }

    #[test]
    fn nan_is_missing() {
        assert!(CellValue::Number(f64::NAN).is_missing());
        assert!(CellValue::Null.is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
    }
}
