/// Coerce a string input into a boolean.
///
/// `"true"` and `"false"` map directly (case-sensitive). Anything else falls
/// back to truthiness: absent or empty is `false`, any other text is `true`.
pub fn coerce_to_bool(value: Option<&str>) -> bool {
    match value {
        Some("true") => true,
        Some("false") => false,
        Some(other) => !other.is_empty(),
        None => false,
    }
}
