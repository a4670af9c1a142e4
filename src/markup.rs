//! HTML fragment parsing and serialization on top of `scraper`.
//!
//! Fragments are parsed the way a browser would parse `body.innerHTML`, so
//! unquoted or upper-case attributes and unclosed tags all come out as a
//! proper tree.

use scraper::{ElementRef, Html, Node};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are written without escaping.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Phrasing elements: whitespace around them is significant.
pub(crate) const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "dfn", "em", "i",
    "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span", "strong",
    "sub", "sup", "svg", "textarea", "time", "u", "var", "wbr",
];

pub(crate) fn parse_fragment(html: &str) -> Html {
    Html::parse_fragment(html)
}

/// Rewrites an attribute value while serializing. Receives the element name,
/// attribute name and current value; `None` keeps the value.
pub(crate) type AttrRewrite<'a> = &'a dyn Fn(&str, &str, &str) -> Option<String>;

/// Leaves every attribute untouched.
pub(crate) fn verbatim(_element: &str, _attr: &str, _value: &str) -> Option<String> {
    None
}

/// Serialize every child of the fragment root.
pub(crate) fn serialize_fragment(fragment: &Html, rewrite: AttrRewrite<'_>) -> String {
    let mut out = String::new();
    write_children(fragment.root_element(), rewrite, &mut out);
    out
}

/// `<name attr="value" ...>`.
pub(crate) fn write_start_tag(
    element: ElementRef<'_>,
    rewrite: AttrRewrite<'_>,
    out: &mut String,
) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        match rewrite(name, attr, value) {
            Some(replaced) => escape_attr(&replaced, out),
            None => escape_attr(value, out),
        }
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn write_element(
    element: ElementRef<'_>,
    rewrite: AttrRewrite<'_>,
    out: &mut String,
) {
    let name = element.value().name();
    write_start_tag(element, rewrite, out);
    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, rewrite, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub(crate) fn write_children(
    parent: ElementRef<'_>,
    rewrite: AttrRewrite<'_>,
    out: &mut String,
) {
    let raw = RAW_TEXT_ELEMENTS.contains(&parent.value().name());
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                if raw {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, rewrite, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
