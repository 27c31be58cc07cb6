//! String helpers shared by the pipeline stages.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that cannot appear in a note file name.
static FORBIDDEN_TITLE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[*"\\/<>:|?]"#).unwrap());

/// Make an article title safe to use as a file stem.
///
/// Every character in `* " \ / < > : | ?` is replaced with a single space and
/// the result is trimmed. Trimming last keeps the rule idempotent when a
/// forbidden character sits at either end.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_title("A/B:C"), "A B C");
/// ```
pub fn sanitize_title(title: &str) -> String {
    FORBIDDEN_TITLE_CHARS
        .replace_all(title, " ")
        .trim()
        .to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary, with
/// an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max)
        .last()
        .unwrap_or(0);
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
