//! Terminal escape stripping.

/// Remove ANSI/VT escape sequences and control characters from `text`.
///
/// Printable text, newlines and tabs survive; carriage returns, backspaces
/// and every other control character are dropped.
pub fn strip_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            out.push('\t');
        }
        let cleaned = strip_ansi_escapes::strip(segment.as_bytes());
        out.extend(
            String::from_utf8_lossy(&cleaned)
                .chars()
                .filter(|c| *c == '\n' || !c.is_control()),
        );
    }
    out
}
