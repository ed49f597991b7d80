/// Sanitize extracted page text before it reaches a prompt.
/// Strips control and zero-width characters, trims lines, drops blank lines.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_whitespace() || !(c.is_control() || is_invisible(*c)))
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // Zero-width space
            | '\u{200C}'
            | '\u{200D}'
            | '\u{2060}' // Word joiner
            | '\u{FEFF}' // BOM
            | '\u{FFFD}' // Replacement character
    )
}
