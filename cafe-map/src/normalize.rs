//! Store name cleaning.
//!
//! Catalog store names carry noise that makes poor search terms: empty
//! parenthesis pairs left behind by the catalog export, stray backspace
//! and other control characters, and arbitrary whitespace. [`normalize`]
//! strips all of it to produce a stable query term.

/// Marker the catalog export leaves where a branch annotation was removed.
const EMPTY_GROUP: &str = "()";

/// Clean a raw store name into a query term.
///
/// Removes every `()` marker, every control character and every
/// whitespace character. Other characters are left untouched, so the
/// function is total and idempotent.
///
/// # Examples
///
/// ```
/// use cafe_map::normalize::normalize;
///
/// assert_eq!(normalize("陶匠咖啡()"), "陶匠咖啡");
/// assert_eq!(normalize("過日子咖啡館 "), "過日子咖啡館");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(raw_name: &str) -> String {
    let mut cleaned: String = raw_name
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();

    // Removing one marker can expose another, e.g. "(())".
    while cleaned.contains(EMPTY_GROUP) {
        cleaned = cleaned.replace(EMPTY_GROUP, "");
    }

    cleaned
}

/// Strip a distinguishing suffix (branch code) from a catalog store key.
///
/// Catalog keys look like `"name{code"`; everything from the first `{`
/// onward is dropped.
pub fn strip_branch_code(store_key: &str) -> &str {
    store_key
        .split_once('{')
        .map_or(store_key, |(name, _)| name)
}
