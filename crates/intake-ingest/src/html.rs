//! HTML to plain text

use scraper::{Html, Node};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "template"];

/// Text content of an HTML document, one line per block of text
///
/// Text inside `script`, `style` and similar elements is dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if skipped {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
