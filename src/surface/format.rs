//! Pretty-printing for the code view.
//!
//! HTML is re-indented only where whitespace does not render: block
//! containers get one child per line, while anything holding text or inline
//! elements is written out on a single line exactly as parsed. CSS comes back
//! unchanged when its delimiters do not balance.

use scraper::{ElementRef, Node};

use super::{parse_css, DocumentContent};
use crate::markup::{
    parse_fragment, serialize_fragment, verbatim, write_element, write_start_tag,
    INLINE_ELEMENTS, RAW_TEXT_ELEMENTS, VOID_ELEMENTS,
};

const INDENT: &str = "  ";

/// Elements whose contents are written verbatim on one line.
const PRESERVED_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Format both halves of a document.
pub fn format_code(content: &DocumentContent) -> DocumentContent {
    DocumentContent {
        html: format_html(&content.html),
        css: format_css(&content.css),
    }
}

/// Indent block-level HTML one level per element.
pub fn format_html(html: &str) -> String {
    let fragment = parse_fragment(html);
    let root = fragment.root_element();
    if has_inline_content(root) {
        return serialize_fragment(&fragment, &verbatim).trim().to_string();
    }

    let mut out = String::with_capacity(html.len() + html.len() / 4);
    write_block_children(root, 0, &mut out);
    out.trim_end().to_string()
}

/// Text or phrasing children make whitespace between them significant.
fn has_inline_content(element: ElementRef<'_>) -> bool {
    element.children().any(|child| match child.value() {
        Node::Text(text) => !text.trim().is_empty(),
        Node::Element(el) => INLINE_ELEMENTS.contains(&el.name()),
        _ => false,
    })
}

fn write_block(element: ElementRef<'_>, depth: usize, out: &mut String) {
    let name = element.value().name();
    let one_line = VOID_ELEMENTS.contains(&name)
        || RAW_TEXT_ELEMENTS.contains(&name)
        || PRESERVED_ELEMENTS.contains(&name)
        || has_inline_content(element)
        || !element.children().any(|child| child.value().is_element());
    if one_line {
        let mut line = String::new();
        write_element(element, &verbatim, &mut line);
        push_line(out, depth, &line);
        return;
    }

    let mut open = String::new();
    write_start_tag(element, &verbatim, &mut open);
    push_line(out, depth, &open);
    write_block_children(element, depth + 1, out);
    push_line(out, depth, &format!("</{name}>"));
}

fn write_block_children(parent: ElementRef<'_>, depth: usize, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Comment(comment) => push_line(out, depth, &format!("<!--{}-->", &**comment)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_block(element, depth, out);
                }
            }
            _ => {}
        }
    }
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}

/// One rule per block, one declaration per line.
///
/// Returns the input unchanged when braces, quotes or parentheses do not
/// balance.
pub fn format_css(css: &str) -> String {
    if !css_balanced(css) {
        tracing::debug!("css not formatted, delimiters unbalanced");
        return css.to_string();
    }
    let mut out = String::new();
    write_css_rules(&mut out, css, 0);
    out.trim_end().to_string()
}

fn write_css_rules(out: &mut String, css: &str, depth: usize) {
    for rule in parse_css(css) {
        if rule.body.is_empty() && rule.selector.ends_with(';') {
            push_line(out, depth, &rule.selector);
            continue;
        }
        push_line(out, depth, &format!("{} {{", rule.selector));
        if rule.selector.starts_with('@') && rule.body.contains('{') {
            write_css_rules(out, &rule.body, depth + 1);
        } else {
            for declaration in split_declarations(&rule.body) {
                push_line(out, depth + 1, &format!("{declaration};"));
            }
        }
        push_line(out, depth, "}");
    }
}

/// Split on `;` outside strings and parentheses.
fn split_declarations(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut parens = 0usize;

    for c in body.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => parens += 1,
            (None, ')') => parens = parens.saturating_sub(1),
            (None, ';') if parens == 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

fn css_balanced(css: &str) -> bool {
    let mut braces = 0i64;
    let mut parens = 0i64;
    let mut quote: Option<char> = None;
    let mut chars = css.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    prev = inner;
                }
                if !closed {
                    return false;
                }
            }
            '"' | '\'' => quote = Some(c),
            '{' => braces += 1,
            '}' => braces -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            _ => {}
        }
        if braces < 0 || parens < 0 {
            return false;
        }
    }
    quote.is_none() && braces == 0 && parens == 0
}
