//! Identifier helpers for generated scope members.
//!
//! Cache-slot names are derived from type names and qualifier payloads, so
//! both have to map onto plain identifiers without unreadable munging.

/// Lowercases the first character, leaving the rest untouched.
///
/// ```
/// use scopegen_support::idents::first_to_lower;
///
/// assert_eq!(first_to_lower("ListFoo"), "listFoo");
/// assert_eq!(first_to_lower(""), "");
/// ```
pub fn first_to_lower(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns `true` if `payload` only uses `[a-zA-Z0-9-]`.
pub fn is_valid_payload(payload: &str) -> bool {
    payload
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Maps a named-qualifier payload onto identifier-safe text.
///
/// ```
/// use scopegen_support::idents::payload_identifier;
///
/// assert_eq!(payload_identifier("db-url"), "db_url");
/// ```
pub fn payload_identifier(payload: &str) -> String {
    payload.replace('-', "_")
}
