//! Document editing surface contract.
//!
//! The interactive editor is an external component. The core only reads and
//! writes it through [`DocumentSurface`]: HTML out, HTML in, CSS out, parsed
//! CSS rules in, plus a change counter for autosave.

mod format;
mod workspace;

pub use format::{format_code, format_css, format_html};
pub use workspace::{View, Workspace};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// An HTML body fragment and its stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub html: String,
    pub css: String,
}

impl DocumentContent {
    pub fn new(html: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
        }
    }

    /// Split a template that carries its CSS in leading `<style>` blocks.
    pub fn from_combined(combined: &str) -> Self {
        let mut css = String::new();
        let mut html = String::new();
        let mut rest = combined;
        loop {
            let lower = rest.to_ascii_lowercase();
            let Some(open) = lower.find("<style") else {
                html.push_str(rest);
                break;
            };
            let Some(open_end) = lower[open..].find('>').map(|i| open + i + 1) else {
                html.push_str(rest);
                break;
            };
            let Some(close) = lower[open_end..].find("</style>").map(|i| open_end + i) else {
                html.push_str(rest);
                break;
            };
            html.push_str(&rest[..open]);
            if !css.is_empty() {
                css.push('\n');
            }
            css.push_str(rest[open_end..close].trim());
            rest = &rest[close + "</style>".len()..];
        }
        Self {
            html: html.trim().to_string(),
            css,
        }
    }

    /// `<style>{css}</style>{html}`, the combined form stored with templates.
    pub fn combined(&self) -> String {
        format!("<style>{}</style>{}", self.css, self.html)
    }
}

/// One top-level stylesheet rule. At-rule blocks (`@media`, `@font-face`)
/// keep their inner text unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    pub selector: String,
    pub body: String,
}

impl CssRule {
    pub fn to_css(&self) -> String {
        format!("{}{{{}}}", self.selector, self.body)
    }
}

/// Split a stylesheet into top-level rules. Comments are dropped; strings and
/// parentheses (e.g. `url(data:...;base64,...)`) are respected.
pub fn parse_css(css: &str) -> Vec<CssRule> {
    let mut rules = Vec::new();
    let mut selector = String::new();
    let mut body = String::new();
    let mut depth = 0usize;
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            sink(depth, &mut selector, &mut body).push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    sink(depth, &mut selector, &mut body).push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for inner in chars.by_ref() {
                if prev == '*' && inner == '/' {
                    break;
                }
                prev = inner;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                sink(depth, &mut selector, &mut body).push(c);
            }
            '{' => {
                if depth > 0 {
                    body.push(c);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    rules.push(CssRule {
                        selector: selector.trim().to_string(),
                        body: body.trim().to_string(),
                    });
                    selector.clear();
                    body.clear();
                } else {
                    body.push(c);
                }
            }
            ';' if depth == 0 => {
                // Statement at-rules such as `@import url(x);`.
                let statement = selector.trim();
                if !statement.is_empty() {
                    rules.push(CssRule {
                        selector: format!("{statement};"),
                        body: String::new(),
                    });
                }
                selector.clear();
            }
            _ => sink(depth, &mut selector, &mut body).push(c),
        }
    }
    rules
}

fn sink<'a>(depth: usize, selector: &'a mut String, body: &'a mut String) -> &'a mut String {
    if depth == 0 {
        selector
    } else {
        body
    }
}

/// Serialize rules back into a stylesheet.
pub fn rules_to_css(rules: &[CssRule]) -> String {
    rules
        .iter()
        .map(|rule| {
            if rule.body.is_empty() && rule.selector.ends_with(';') {
                rule.selector.clone()
            } else {
                rule.to_css()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accessor contract of the embedded editing component.
pub trait DocumentSurface: Send {
    fn get_html(&self) -> String;
    fn get_css(&self) -> String;
    fn set_components(&mut self, html: &str);
    fn set_style(&mut self, rules: Vec<CssRule>);
    /// Receiver whose value increments on every change.
    fn changes(&self) -> watch::Receiver<u64>;

    /// Both accessors at once.
    fn content(&self) -> DocumentContent {
        DocumentContent {
            html: self.get_html(),
            css: self.get_css(),
        }
    }

    /// Write HTML then parsed CSS.
    fn set_content(&mut self, content: &DocumentContent) {
        self.set_components(&content.html);
        self.set_style(parse_css(&content.css));
    }
}

/// In-memory [`DocumentSurface`], used headless and in tests.
#[derive(Debug)]
pub struct MemorySurface {
    html: String,
    rules: Vec<CssRule>,
    changes: watch::Sender<u64>,
}

impl MemorySurface {
    pub fn new(content: &DocumentContent) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            html: content.html.clone(),
            rules: parse_css(&content.css),
            changes,
        }
    }

    fn bump(&self) {
        self.changes.send_modify(|count| *count += 1);
    }
}

impl DocumentSurface for MemorySurface {
    fn get_html(&self) -> String {
        self.html.clone()
    }

    fn get_css(&self) -> String {
        rules_to_css(&self.rules)
    }

    fn set_components(&mut self, html: &str) {
        self.html = html.to_string();
        self.bump();
    }

    fn set_style(&mut self, rules: Vec<CssRule>) {
        self.rules = rules;
        self.bump();
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_css_rules_and_media() {
        let css = "/* c */ h1 { color: red; }\n@media (max-width: 600px) { h1 { font-size: 2em; } }\n@import url(x.css);";
        let rules = parse_css(css);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].selector, "h1");
        assert_eq!(rules[0].body, "color: red;");
        assert_eq!(rules[1].selector, "@media (max-width: 600px)");
        assert_eq!(rules[1].body, "h1 { font-size: 2em; }");
        assert_eq!(rules[2].selector, "@import url(x.css);");
    }

    #[test]
    fn test_parse_css_keeps_data_uri_and_strings() {
        let css = r#".bg { background: url("data:image/png;base64,AAA}") no-repeat; }"#;
        let rules = parse_css(css);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].body.contains("base64,AAA}"));
    }

    #[test]
    fn test_from_combined_splits_style() {
        let content = DocumentContent::from_combined("<style>p{color:red}</style><p>Hi</p>");
        assert_eq!(content.css, "p{color:red}");
        assert_eq!(content.html, "<p>Hi</p>");
        assert_eq!(DocumentContent::from_combined(&content.combined()), content);
    }

    #[test]
    fn test_memory_surface_counts_changes() {
        let mut surface = MemorySurface::new(&DocumentContent::new("<p>a</p>", "p{color:red}"));
        let rx = surface.changes();
        surface.set_content(&DocumentContent::new("<p>b</p>", "p{color:blue}"));
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(surface.get_html(), "<p>b</p>");
        assert_eq!(surface.get_css(), "p{color:blue}");
    }
}
