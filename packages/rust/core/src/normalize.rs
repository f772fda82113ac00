//! Display-name normalization for fetched municipalities.

use std::sync::LazyLock;

use regex::Regex;

/// Leading run of characters up to the first `(` or `,`.
static LEADING_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^(,]+").expect("valid regex"));

/// Strip a disambiguation suffix from a municipality name.
///
/// Keeps everything before the first `(` or `,`, trimmed:
/// `"Springfield (Example)"` becomes `"Springfield"`. Returns `None` when
/// nothing is left, e.g. for names that start with `(`.
pub fn normalize_name(name: &str) -> Option<String> {
    LEADING_NAME_RE
        .find(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
