//! Shared helpers used by every reader, the columnar writer, and the loader.

use crate::row::{ChargeRow, CodeSlot};

/// Replaces invalid UTF-8 byte sequences with U+FFFD (the columnar path) and
/// trims leading/trailing whitespace. Used by every reader before a string
/// value reaches a `ChargeRow` field.
pub fn sanitize_utf8_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Same sanitization, but for a value that arrived as a `&str` already
/// (still trims; invalid UTF-8 can't occur once it's a `&str`, but an
/// in-memory JSON/CSV reader may have invalid bytes in the surrounding
/// buffer which the lossy conversion upstream already replaced).
pub fn trim_sanitized(s: &str) -> String {
    s.trim().to_string()
}

/// Replaces invalid UTF-8 with a single space, used on the relational load
/// path.
pub fn sanitize_utf8_relational(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().to_string(),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes);
            lossy.replace('\u{FFFD}', " ").trim().to_string()
        }
    }
}

/// Trims whitespace, strips thousands-separator commas and a leading `$`,
/// then parses as `f64`. Empty or unparseable input yields `None` rather than
/// an error.
pub fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Lifts a nullable string into the database-side nullable wrapper: `None`
/// when empty after trimming, `Some` otherwise.
pub fn opt_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lifts a nullable numeric string into `Option<f64>` via [`parse_float`].
pub fn opt_numeric(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_float)
}

/// Yields the populated code columns of `row` as `(value, type)` pairs, in
/// the canonical order from the data model.
/// This is the read half of the polymorphic code-column dispatch; `set_code`
/// on [`ChargeRow`] is the write half.
pub fn collect_codes(row: &ChargeRow) -> Vec<(&str, CodeSlot)> {
    CodeSlot::ORDER
        .iter()
        .filter_map(|slot| row.get_code(*slot).map(|value| (value, *slot)))
        .collect()
}

/// Formats an `f64` using Rust's `Display` impl, which already produces the
/// shortest string that round-trips back to the same value — the numeric
/// semantics wanted when handing a decimal to Postgres as text.
pub fn format_numeric(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_float_strips_commas_and_dollar_signs() {
        assert_eq!(parse_float("$1,250.00"), Some(1250.0));
        assert_eq!(parse_float("  1,500  "), Some(1500.0));
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("   "), None);
        assert_eq!(parse_float("N/A"), None);
    }

    #[test]
    fn opt_text_empties_to_none() {
        assert_eq!(opt_text(Some("  ")), None);
        assert_eq!(opt_text(Some(" Aetna ")), Some("Aetna".to_string()));
        assert_eq!(opt_text(None), None);
    }

    #[test]
    fn collect_codes_preserves_canonical_order_and_skips_unset() {
        let mut row = ChargeRow::default();
        row.set_code(CodeSlot::Ndc, "00456-0422-01");
        row.set_code(CodeSlot::Cpt, "93306");

        let codes = collect_codes(&row);
        assert_eq!(
            codes,
            vec![("93306", CodeSlot::Cpt), ("00456-0422-01", CodeSlot::Ndc)]
        );
    }

    #[test]
    fn format_numeric_round_trips() {
        let formatted = format_numeric(1234.5);
        let parsed: f64 = formatted.parse().unwrap();
        assert_eq!(parsed, 1234.5);
    }
}
