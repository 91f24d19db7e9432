//! Text helpers for rendering meta values.

/// Shortens `text` to at most `width` characters.
///
/// Whitespace runs collapse to single spaces first. If the text is still too
/// long, whole words are kept while they fit together with `placeholder`.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(placeholder.chars().count());
    let mut out = String::new();
    let mut used = 0;
    for word in collapsed.split(' ') {
        let cost = word.chars().count() + usize::from(!out.is_empty());
        if used + cost > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += cost;
    }
    out.push_str(placeholder);
    out
}

/// Turns `\r` into `\n` and collapses blank lines.
///
/// With a `paragraph_separator`, the remaining line breaks are replaced by it.
pub fn normalize_line_breaks(text: &str, paragraph_separator: Option<&str>) -> String {
    let mut value = text.replace('\r', "\n");
    while value.contains("\n\n") {
        value = value.replace("\n\n", "\n");
    }
    match paragraph_separator {
        Some(separator) => value.replace('\n', separator),
        None => value,
    }
}
