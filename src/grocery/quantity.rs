//! Best-effort parsing of free-text grocery quantities.
//!
//! This is not a unit-conversion system: `"lbs"` and `"kg"` are simply
//! different unit keys. Nothing outside the grocery module should depend
//! on these heuristics.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading integer or decimal, optional whitespace, optional alphabetic unit token.
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(\p{Alphabetic}+)?").expect("quantity pattern is valid"));

/// A parsed quantity: numeric amount plus normalized (lower-cased) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    fn new(value: f64, unit: impl Into<String>) -> Self {
        Self { value, unit: unit.into() }
    }
}

/// Parse a free-text quantity.
///
/// - `""` → `(0.0, "")`
/// - `"2 lbs"` → `(2.0, "lbs")`
/// - `"3"` → `(3.0, "")`
/// - `".5"` → `(0.5, "")` (whole string is a number)
/// - `"dozen"` → `(0.0, "dozen")` (no number at all: the text is the unit)
pub fn parse_quantity(input: &str) -> Quantity {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Quantity::new(0.0, "");
    }

    if let Some(caps) = LEADING_NUMBER.captures(trimmed) {
        // A digit run too long for f64 parses as inf; treat it like any other non-finite text
        if let Some(value) = caps[1].parse::<f64>().ok().filter(|v| v.is_finite()) {
            let unit = caps
                .get(2)
                .map(|m| m.as_str().trim().to_lowercase())
                .unwrap_or_default();
            return Quantity::new(value, unit);
        }
    }

    // Non-finite spellings ("inf", "NaN") fall through to the unit branch
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Quantity::new(value, ""),
        _ => Quantity::new(0.0, trimmed.to_lowercase()),
    }
}

/// Render an aggregated quantity.
///
/// Whole numbers keep one decimal place (`3.0`), so merged quantities read
/// the same regardless of how the inputs were written. With no unit, a zero
/// total renders as the empty string.
pub fn format_quantity(value: f64, unit: &str) -> String {
    let number = format_number(value);
    if !unit.is_empty() {
        format!("{} {}", number, unit)
    } else if value == 0.0 {
        String::new()
    } else {
        number
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> (f64, String) {
        let q = parse_quantity(input);
        (q.value, q.unit)
    }

    #[test]
    fn parses_common_quantities() {
        assert_eq!(parsed("2 lbs"), (2.0, "lbs".to_string()));
        assert_eq!(parsed("3"), (3.0, String::new()));
        assert_eq!(parsed(""), (0.0, String::new()));
        assert_eq!(parsed("dozen"), (0.0, "dozen".to_string()));
    }

    #[test]
    fn parses_number_and_unit_variants() {
        let cases = [
            ("1.5 cups", 1.5, "cups"),
            ("2lbs", 2.0, "lbs"),
            ("  4   Gal  ", 4.0, "gal"),
            ("1 L", 1.0, "l"),
            ("10 KG", 10.0, "kg"),
            ("3 cans of beans", 3.0, "cans"),
            ("2 1/2 cups", 2.0, ""),
            ("12", 12.0, ""),
            ("0.25", 0.25, ""),
            ("500g", 500.0, "g"),
            ("2 Stück", 2.0, "stück"),
        ];

        for (input, value, unit) in cases {
            assert_eq!(parsed(input), (value, unit.to_string()), "input {:?}", input);
        }
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(parsed("   "), (0.0, String::new()));
        assert_eq!(parsed("\t\n"), (0.0, String::new()));
    }

    #[test]
    fn whole_string_number_without_leading_digit() {
        assert_eq!(parsed(".5"), (0.5, String::new()));
        assert_eq!(parsed("1e3"), (1.0, "e".to_string()));
    }

    #[test]
    fn text_without_number_becomes_unit() {
        assert_eq!(parsed("A Bunch"), (0.0, "a bunch".to_string()));
        assert_eq!(parsed("some"), (0.0, "some".to_string()));
        assert_eq!(parsed("-2 lbs"), (0.0, "-2 lbs".to_string()));
        assert_eq!(parsed("inf"), (0.0, "inf".to_string()));
        assert_eq!(parsed("NaN"), (0.0, "nan".to_string()));
    }

    #[test]
    fn overflowing_digits_are_not_a_number() {
        let input = format!("{} gal", "9".repeat(400));
        let q = parse_quantity(&input);
        assert!(q.value.is_finite());
        assert_eq!(q.value, 0.0);
        assert_eq!(q.unit, input);
        assert_ne!(q.unit, "gal");
    }

    #[test]
    fn formats_with_unit() {
        assert_eq!(format_quantity(3.0, "gal"), "3.0 gal");
        assert_eq!(format_quantity(2.5, "cups"), "2.5 cups");
        assert_eq!(format_quantity(0.0, "dozen"), "0.0 dozen");
    }

    #[test]
    fn formats_without_unit() {
        assert_eq!(format_quantity(5.0, ""), "5.0");
        assert_eq!(format_quantity(0.75, ""), "0.75");
        assert_eq!(format_quantity(0.0, ""), "");
    }
}
