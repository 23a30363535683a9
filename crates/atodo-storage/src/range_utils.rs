//! Range query helpers for prefix scans.

/// Calculate the exclusive end bound for a prefix range query.
///
/// Given prefix "todo/general/u1/", returns "todo/general/u10" (next ASCII
/// char after '/'), so `range(prefix..end)` covers exactly the prefix.
fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Create a prefix range for redb queries.
pub(crate) fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_string(), prefix_end_bound(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end_bound() {
        assert_eq!(prefix_end_bound("todo/"), "todo0");
        assert_eq!(prefix_end_bound("todo/general/u1/"), "todo/general/u10");
        assert_eq!(prefix_end_bound(""), "");
    }

    #[test]
    fn test_prefix_range() {
        let (start, end) = prefix_range("a/");
        assert_eq!(start, "a/");
        assert_eq!(end, "a0");
    }
}
