//! Identifier normalization for template keys.
//!
//! Rule names arrive in whatever convention the upstream mapping produced
//! (`S3_BUCKET_PUBLIC_READ_PROHIBITED`, `s3-bucket-public-read-prohibited`,
//! `excludedBuckets`). Template keys must be plain alphanumeric PascalCase.

/// Convert free-form text into a PascalCase identifier.
///
/// Text with no `-` or `_` that starts lower-case is treated as camelCase and
/// only its first character is upper-cased. Everything else is split on
/// `-`/`_` and each word is capitalized (first upper, rest lower).
pub fn normalize(text: &str) -> String {
    let has_separator = text.contains('-') || text.contains('_');
    let starts_lower = text.chars().next().is_some_and(char::is_lowercase);

    if !has_separator && starts_lower {
        return upper_first(text);
    }

    text.replace('_', "-").split('-').map(capitalize).collect()
}

/// Lower-case only the first character, leaving the rest untouched.
///
/// Used to derive a condition name from its parameter key.
pub fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
