//! Prompt text sent to the generative text service.

/// Compose the single instruction for one edit request.
///
/// `html` and `css` must already have their embedded images replaced with
/// placeholder tokens.
pub fn build_prompt(request: &str, html: &str, css: &str) -> String {
    format!(
        r#"You are an expert web designer.
Task: modify the following HTML and CSS according to this request: "{request}".

Current HTML:
{html}

Current CSS:
{css}

Output rules:
1. Respond with ONLY a JSON object, nothing before or after it.
2. The object has exactly three keys: "html", "css" and "message".
3. "html" is the complete modified HTML.
4. "css" is the complete modified CSS.
5. "message" is a short, friendly summary of what you changed.
6. Do not wrap the JSON in Markdown code fences.
7. Keep the markup valid.
8. Image placeholders such as __BASE64_IMAGE_0__ must be copied through exactly as they appear. Only change or remove them if the request explicitly asks to replace images.

Layout rules, so the design still exports to PDF and images:
- Keep one clear container (usually .invitation-container) with a solid background color or a stable background image.
- Use simple box-shadow values such as 0 4px 6px -1px rgb(0 0 0 / 0.1); no layered shadows.
- Keep a fixed aspect ratio on the design container.
- Do not position important text with position: absolute unless its parent is position: relative and keeps its size.
- Keep all text inside the bounds of the background."#,
        request = request.trim(),
    )
}
