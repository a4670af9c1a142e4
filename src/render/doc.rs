//! Word-compatible `.doc` output.
//!
//! Word opens an HTML document that declares the Office namespaces. This path
//! keeps the live markup as text; nothing is rasterized.

const WORD_NAMESPACES: &str = "xmlns:o='urn:schemas-microsoft-com:office:office' \
xmlns:w='urn:schemas-microsoft-com:office:word' \
xmlns='http://www.w3.org/TR/REC-html40'";

/// Wrap `html` + `css` in a Word-compatible document shell.
pub fn render_to_doc(html: &str, css: &str, title: &str) -> Vec<u8> {
    format!(
        "<html {WORD_NAMESPACES}><head><meta charset='utf-8'><title>{}</title></head><body>\
<style>{css}</style>{html}</body></html>",
        escape_text(title)
    )
    .into_bytes()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
