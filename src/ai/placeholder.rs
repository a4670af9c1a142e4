//! Swapping embedded base64 images for short placeholder tokens.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static DATA_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data:image/[^;]+;base64,[^\s"')]+"#).expect("static regex is valid")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__BASE64_IMAGE_(\d+)__").expect("static regex is valid"));

/// Token-to-data-URI mapping for one AI transaction.
///
/// Every occurrence gets its own token, numbered from 0 in the order seen;
/// the counter carries over between calls to [`strip`](Self::strip), so HTML
/// and CSS stripped with the same map never collide.
#[derive(Debug, Clone, Default)]
pub struct ImagePlaceholderMap {
    images: BTreeMap<usize, String>,
    next: usize,
}

impl ImagePlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(index: usize) -> String {
        format!("__BASE64_IMAGE_{index}__")
    }

    /// Replace each embedded image in `text` with a fresh token.
    pub fn strip(&mut self, text: &str) -> String {
        DATA_IMAGE
            .replace_all(text, |caps: &Captures<'_>| {
                let index = self.next;
                self.next += 1;
                self.images.insert(index, caps[0].to_string());
                Self::token(index)
            })
            .into_owned()
    }

    /// Put the original data URIs back. Unknown tokens are left as-is.
    pub fn restore(&self, text: &str) -> String {
        TOKEN
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.images.get(&index))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Tokens this map issued that appear in none of `texts`.
    pub fn missing_tokens(&self, texts: &[&str]) -> Vec<String> {
        self.images
            .keys()
            .map(|&index| Self::token(index))
            .filter(|token| !texts.iter().any(|text| text.contains(token.as_str())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";
    const JPG: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    #[test]
    fn test_strip_numbers_across_html_and_css() {
        let mut map = ImagePlaceholderMap::new();
        let html = format!(r#"<img src="{PNG}"><img src='{PNG}'>"#);
        let css = format!(".hero{{background:url({JPG}) no-repeat}}");

        let html_out = map.strip(&html);
        let css_out = map.strip(&css);

        assert_eq!(
            html_out,
            r#"<img src="__BASE64_IMAGE_0__"><img src='__BASE64_IMAGE_1__'>"#
        );
        assert_eq!(css_out, ".hero{background:url(__BASE64_IMAGE_2__) no-repeat}");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_restore_is_exact() {
        let mut map = ImagePlaceholderMap::new();
        let html = format!(r#"<div><img src="{PNG}" alt="a"></div>"#);
        let stripped = map.strip(&html);
        assert!(!stripped.contains("base64"));
        assert_eq!(map.restore(&stripped), html);
    }

    #[test]
    fn test_restore_leaves_unknown_tokens() {
        let map = ImagePlaceholderMap::new();
        assert_eq!(map.restore("x __BASE64_IMAGE_7__ y"), "x __BASE64_IMAGE_7__ y");
    }

    #[test]
    fn test_missing_tokens() {
        let mut map = ImagePlaceholderMap::new();
        map.strip(&format!("<img src=\"{PNG}\"><img src=\"{JPG}\">"));
        let missing = map.missing_tokens(&["<img src=\"__BASE64_IMAGE_1__\">", ""]);
        assert_eq!(missing, vec!["__BASE64_IMAGE_0__".to_string()]);
    }

    #[test]
    fn test_no_images_is_noop() {
        let mut map = ImagePlaceholderMap::new();
        assert_eq!(map.strip("<p>plain</p>"), "<p>plain</p>");
        assert!(map.is_empty());
    }
}
