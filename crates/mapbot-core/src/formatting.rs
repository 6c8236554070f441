/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cut `text` to at most `max_bytes`, respecting UTF-8 boundaries.
///
/// Appends `...` when something was removed (the marker counts toward the limit).
pub fn truncate_for_telegram(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let budget = max_bytes.saturating_sub(3);
    let mut end = 0usize;
    for (i, ch) in text.char_indices() {
        if i + ch.len_utf8() > budget {
            break;
        }
        end = i + ch.len_utf8();
    }
    format!("{}...", &text[..end])
}
