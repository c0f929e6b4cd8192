//! Small text helpers used by configuration parsing and storage adapters.

/// Splits a comma-separated list, trimming entries and dropping empty ones.
///
/// ```
/// use eom_domain::common::split_list;
///
/// assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
/// ```
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns `None` for empty or whitespace-only strings.
///
/// SQLite rows store "no selection" as an empty column.
pub fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_handles_empty_input() {
        assert!(split_list("").is_empty());
        assert!(split_list(" , ,").is_empty());
    }

    #[test]
    fn none_if_blank_filters_whitespace() {
        assert_eq!(none_if_blank(Some("  ".into())), None);
        assert_eq!(none_if_blank(None), None);
        assert_eq!(none_if_blank(Some("dream".into())), Some("dream".into()));
    }
}
