//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format dependency chains and "did you mean?"
//! suggestions in error output.

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use scopegen_support::rendering::render_chain;
///
/// let chain = vec!["userService", "userRepo", "database", "userService"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "userService → userRepo → database → userService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Generates "did you mean?" suggestions for a requested name.
///
/// Compares the requested name against the available ones and returns at
/// most `max_suggestions` close matches, best first.
///
/// ```
/// use scopegen_support::rendering::suggest_similar;
///
/// let available = ["userService", "database"];
/// assert_eq!(suggest_similar("userServise", &available, 3), vec!["userService"]);
/// ```
pub fn suggest_similar(
    requested: &str,
    available: &[impl AsRef<str>],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| *name != requested)
        .filter_map(|name| {
            let name_lower = name.to_lowercase();

            // Exact substring match (highest priority)
            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if close_enough(&requested_lower, &name_lower) {
                return Some((name, 90));
            }

            // Common prefix
            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Quick check if two strings are "close enough" to be a typo of each other.
///
/// Not a full Levenshtein. Length within 3 and at least 60% of positions
/// matching.
fn close_enough(a: &str, b: &str) -> bool {
    let len_diff = a.len().abs_diff(b.len());
    if len_diff > 3 {
        return false;
    }

    let common: usize = a
        .chars()
        .zip(b.chars())
        .filter(|(ca, cb)| ca == cb)
        .count();

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return true;
    }

    common * 100 / max_len >= 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["a", "b", "c", "a"];
        assert_eq!(render_chain(&chain), "a → b → c → a");
    }

    #[test]
    fn render_single_element_chain() {
        let chain = vec!["a"];
        assert_eq!(render_chain(&chain), "a");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn suggest_similar_names() {
        let available = vec!["userService", "userRepository", "logger", "database"];

        let suggestions = suggest_similar("userServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0], "userService");
    }

    #[test]
    fn suggest_skips_exact_name() {
        let available = vec!["database"];
        assert!(suggest_similar("database", &available, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["database"];
        let suggestions = suggest_similar("xyzAbcDef", &available, 3);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn close_enough_check() {
        assert!(close_enough("userservice", "userservise"));
        assert!(close_enough("database", "databse"));
        assert!(!close_enough("database", "logger"));
    }
}
