/// Canonical form of OCR output: uppercase, restricted to `A-Z`, `0-9` and
/// `-`. Everything else (whitespace, punctuation, lowercase-only symbols
/// without an ASCII uppercase form) is dropped.
pub fn normalize_plate_text(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| is_plate_symbol(*c))
        .collect()
}

pub fn is_plate_symbol(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'
}
