//! Enhanced text → sanitized HTML body.

use pulldown_cmark::{html, Options, Parser};

/// Converts model output to HTML. Output whose first non-blank character is
/// `<` is already markup and passes through; anything else is Markdown.
pub fn to_html(enhanced: &str) -> String {
    let trimmed = enhanced.trim();
    if trimmed.starts_with('<') {
        return trimmed.to_string();
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(trimmed, options);
    let mut html_output = String::with_capacity(trimmed.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

/// Removes scripts, event handlers, `javascript:` URLs and anything else
/// outside ammonia's default allow-list. Model output is untrusted.
pub fn sanitize(html: &str) -> String {
    ammonia::Builder::default().clean(html).to_string()
}

/// The body fragment injected into the page template.
pub fn body_html(enhanced: &str) -> String {
    sanitize(&to_html(enhanced))
}
