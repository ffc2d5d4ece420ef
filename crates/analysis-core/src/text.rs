//! Helpers for the regulator's Latin-1, comma-decimal text files.

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse an amount written with either `.` or `,` as the decimal separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
}

/// Strip a leading UTF-8 byte order mark.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"\xdaLTIMO"), "ÚLTIMO");
        assert_eq!(decode_latin1(b"MILH\xc3O"), "MILHÃO");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1234.5"), Some(1234.5));
        assert_eq!(parse_amount(" -12,25 "), Some(-12.25));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}123"), "123");
        assert_eq!(strip_bom("123"), "123");
    }
}
