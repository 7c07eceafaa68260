//! HTML normalization applied to every snapshot before it is written.
//!
//! Scripts and stylesheets churn on most sites without any visible change,
//! so they are dropped to keep the commit history meaningful.

use scraper::{Html, Selector};
use std::sync::OnceLock;

fn stripped_elements() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("script, style").expect("static selector is valid"))
}

/// Parse `content` as an HTML document, drop every `<script>` and `<style>`
/// element (with their contents) and serialize the result back to text.
pub fn strip(content: &str) -> String {
    let mut document = Html::parse_document(content);

    let doomed: Vec<_> = document
        .select(stripped_elements())
        .map(|element| element.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.html()
}
