//! Filesystem-safe naming helpers.
//!
//! Pure, total functions: they never fail, and map arbitrary titles/URLs to
//! names that are safe on any filesystem. Distinct realistic titles map to
//! distinct names; a true collision overwrites, which is accepted and
//! documented in DESIGN.md.

/// Map an episode title to a filesystem-safe file stem.
///
/// Keeps alphanumerics and collapses whitespace runs into single
/// underscores; everything else is dropped. An empty result falls back to
/// `"untitled"` so the caller always gets a usable name.
pub fn safe_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let stem = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}

/// Extract the path basename of a URL with any query string stripped.
///
/// `https://cdn.example/shows/ep1.mp3?token=abc` becomes `ep1.mp3`. Falls
/// back to `"audio"` when the URL has no usable basename.
pub fn url_basename(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);

    let basename = match after_scheme.split_once('/') {
        Some((_, path)) => path.rsplit('/').next().unwrap_or("").trim(),
        None => "",
    };

    if basename.is_empty() {
        "audio".to_string()
    } else {
        basename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_punctuation_and_joins_words() {
        assert_eq!(safe_file_stem("Ep. #42: The \"Big\" One!"), "Ep_42_The_Big_One");
    }

    #[test]
    fn stem_collapses_whitespace() {
        assert_eq!(safe_file_stem("  a   b \t c "), "a_b_c");
    }

    #[test]
    fn stem_never_empty() {
        assert_eq!(safe_file_stem(""), "untitled");
        assert_eq!(safe_file_stem("!!!"), "untitled");
    }

    #[test]
    fn basename_strips_query_and_fragment() {
        assert_eq!(url_basename("https://x/a/b/ep1.mp3?sig=abc&t=1"), "ep1.mp3");
        assert_eq!(url_basename("https://x/ep2.mp3#t=30"), "ep2.mp3");
    }

    #[test]
    fn basename_falls_back_when_unusable() {
        assert_eq!(url_basename("https://x/dir/?q=1"), "audio");
        assert_eq!(url_basename("https://host.example"), "audio");
    }
}
