//! Heading anchors and navigation titles in the static-site generator's style.

use regex::Regex;
use std::sync::LazyLock;

static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

static RE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Heading anchor slug: drop everything but word characters, spaces and
/// hyphens, lowercase, and collapse whitespace/hyphen runs into one `-`.
///
/// Underscores survive, so a property `max_size` links to `#max_size`.
pub fn slugify(text: &str) -> String {
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    let cleaned = RE_NON_WORD.replace_all(&ascii, "");
    let lowered = cleaned.trim().to_lowercase();
    RE_SEPARATORS.replace_all(&lowered, "-").into_owned()
}

/// Link to the heading rendered for `name`.
pub fn heading_link(name: &str) -> String {
    format!("[`{}`](#{})", name, slugify(name))
}

/// Navigation title for a directory: separators become spaces and an
/// all-lowercase name gets its first letter capitalized.
pub fn dirname_to_title(dirname: &str) -> String {
    let title = dirname.replace(['-', '_'], " ");
    if title.chars().any(char::is_uppercase) {
        return title;
    }
    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_keeps_underscores() {
        assert_eq!(slugify("max_size"), "max_size");
    }

    #[test]
    fn slug_simple() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slugify("Class **Shape**"), "class-shape");
        assert_eq!(slugify("pkg.mod"), "pkgmod");
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slugify("a -  b"), "a-b");
    }

    #[test]
    fn heading_link_for_property() {
        assert_eq!(heading_link("area"), "[`area`](#area)");
    }

    #[test]
    fn directory_titles() {
        assert_eq!(dirname_to_title("sample_pkg"), "Sample pkg");
        assert_eq!(dirname_to_title("API-docs"), "API docs");
    }
}
