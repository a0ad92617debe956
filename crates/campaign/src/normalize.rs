//! Raw phone numbers → canonical destination digit strings.

use std::path::Path;

use tracing::warn;

/// ISO 3166 region → E.164 calling code, for the regions the campaign
/// tooling ships with.
const REGION_CALLING_CODES: &[(&str, &str)] = &[
    ("AU", "61"),
    ("BR", "55"),
    ("CA", "1"),
    ("DE", "49"),
    ("ES", "34"),
    ("GB", "44"),
    ("IT", "39"),
    ("MX", "52"),
    ("PT", "351"),
    ("RU", "7"),
    ("US", "1"),
    ("ZA", "27"),
];

/// Look up the calling code for a 2-letter region (case-insensitive).
#[must_use]
pub fn calling_code_for_region(region: &str) -> Option<&'static str> {
    let upper = region.to_ascii_uppercase();
    REGION_CALLING_CODES
        .iter()
        .find(|(iso, _)| *iso == upper)
        .map(|(_, code)| *code)
}

/// Resolve the default country code from the country file.
///
/// The first non-comment, non-blank line wins: a literal digit sequence is
/// used directly, otherwise the line is treated as a 2-letter region code.
/// Missing file, unreadable file, or an unknown region all mean no default
/// prefix is applied.
#[must_use]
pub fn default_country_code(path: &Path) -> Option<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read country file");
            return None;
        },
    };

    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))?;

    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        return Some(digits);
    }

    match calling_code_for_region(line) {
        Some(code) => Some(code.to_string()),
        None => {
            warn!(region = line, "unknown region in country file");
            None
        },
    }
}

/// Normalize a raw number into a canonical destination digit string.
///
/// Non-digits are stripped. An explicit `+` international marker keeps the
/// digits as-is; otherwise the default country code, when configured, is
/// prepended. Inputs with no digits normalize to the empty string, which
/// callers drop.
#[must_use]
pub fn normalize(raw: &str, default_country_code: Option<&str>) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return String::new();
    }

    let mut n = if trimmed.starts_with('+') {
        digits
    } else if let Some(code) = default_country_code {
        format!("{code}{digits}")
    } else {
        digits
    };

    // Brazilian numbering-plan quirk: 13 digits as 55 + area + extra
    // leading mobile 9 + 8 subscriber digits. Drop the extra 9.
    if n.len() == 13 && n.starts_with("55") && n.as_bytes()[4] == b'9' {
        n.remove(4);
    }

    n
}
