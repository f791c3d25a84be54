//! Token matching over received bytes.

/// Result of matching one finished receive cycle against a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Classification {
    StringFound,
    StringNotFound,
    /// Nothing arrived before the start timeout.
    TimedOut,
}

/// Case sensitive substring search over a text view.
///
/// The text ends at the first NUL, an empty text never matches.
pub fn contains(text: &[u8], token: &str) -> bool {
    let end = text.iter().position(|b| *b == 0).unwrap_or(text.len());
    let text = &text[..end];
    if text.is_empty() {
        return false;
    }
    find_in_binary(text, token.as_bytes()).is_some()
}

/// Offset of the first occurrence of `token` in `data`, NUL bytes included.
///
/// A mismatch restarts the scan one byte after the failed candidate start,
/// so the lowest matching offset wins.
pub fn find_in_binary(data: &[u8], token: &[u8]) -> Option<usize> {
    if token.is_empty() || data.len() < token.len() {
        return None;
    }
    data.windows(token.len()).position(|window| window == token)
}
