//! Title to filename-safe slug.

/// Lowercase ASCII slug of `title`.
///
/// - Keeps ASCII letters and digits, lowercased
/// - Replaces runs of whitespace, `-`, `_`, `/`, `\`, `.` and control chars with a single `-`
/// - Drops every other character (punctuation, non-ASCII)
/// - Trims leading/trailing `-`
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_dash = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if c.is_whitespace() || c.is_control() || matches!(c, '-' | '_' | '/' | '\\' | '.') {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
        }
    }

    let trimmed = out.trim_matches('-');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_become_single_dash() {
        assert_eq!(slugify("a/b\\c  d__e"), "a-b-c-d-e");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slugify("  ..  Clip Title  ..  "), "clip-title");
    }

    #[test]
    fn drops_punctuation_and_non_ascii() {
        assert_eq!(slugify("Rock'n'Roll: Live! (2024)"), "rocknroll-live-2024");
        assert_eq!(slugify("Café Ümlaut"), "caf-mlaut");
    }

    #[test]
    fn control_chars() {
        assert_eq!(slugify("file\x00name"), "file-name");
        assert_eq!(slugify("\t\n"), "");
    }
}
