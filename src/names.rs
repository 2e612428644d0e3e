use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a sanitized path segment, in characters.
pub const MAX_NAME_LEN: usize = 80;

const EMPTY_NAME: &str = "file";

static UNSAFE_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\- ]").expect("valid sanitizer regex"));

/// Turn an arbitrary display name into a safe, bounded path segment.
///
/// Every character outside `[A-Za-z0-9_.\- ]` becomes `_`, surrounding
/// whitespace is trimmed, the result is cut to [`MAX_NAME_LEN`] characters and
/// an empty result becomes `"file"`.
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHAR.replace_all(name, "_");
    let truncated: String = replaced.trim().chars().take(MAX_NAME_LEN).collect();
    if truncated.is_empty() {
        EMPTY_NAME.to_string()
    } else {
        truncated
    }
}

/// Case-insensitive suffix check used before appending an export extension.
pub fn has_extension(name: &str, ext: &str) -> bool {
    name.to_ascii_lowercase().ends_with(&ext.to_ascii_lowercase())
}
