//! Filename sanitization

/// Make an album or track title safe to use as a single path component
///
/// Characters reserved on Windows and control characters become `_`;
/// trailing dots and spaces (silently stripped by Windows) are removed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("Halo 3: ODST"), "Halo 3_ ODST");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches(['.', ' ']);

    match trimmed {
        "" | "." | ".." => "_".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_reserved_characters() {
        assert_eq!(sanitize_filename("Halo 3: ODST"), "Halo 3_ ODST");
        assert_eq!(sanitize_filename("AC/DC"), "AC_DC");
        assert_eq!(sanitize_filename("What?*<>|\"\\"), "What_______");
    }

    #[test]
    fn test_sanitize_control_characters() {
        assert_eq!(sanitize_filename("Tab\there"), "Tab_here");
    }

    #[test]
    fn test_trailing_dots_and_whitespace() {
        assert_eq!(sanitize_filename("  Vol. 2...  "), "Vol. 2");
    }

    #[test]
    fn test_never_empty() {
        assert_eq!(sanitize_filename(""), "_");
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename("   "), "_");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(
            sanitize_filename("Normal Soundtrack Name"),
            "Normal Soundtrack Name"
        );
    }
}
