//! Visible text extraction from fetched HTML.

use scraper::{Html, Node};

/// Elements whose text never reaches a reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Extract the human-visible text of an HTML document.
///
/// Text nodes inside hidden elements are skipped and whitespace runs collapse
/// to single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the document title, if any.
pub fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_element().map(|element| (node, element)))
        .find(|(_, element)| element.name() == "title")
        .map(|(node, _)| {
            node.descendants()
                .filter_map(|child| child.value().as_text().map(|t| String::from(&**t)))
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let html = r#"
            <html>
                <head><title>Board</title><style>body { color: red }</style></head>
                <body>
                    <h1>Weekly   leaderboard</h1>
                    <script>var secret = 1;</script>
                    <p>Top <b>ten</b> players</p>
                </body>
            </html>
        "#;
        assert_eq!(visible_text(html), "Weekly leaderboard Top ten players");
    }

    #[test]
    fn test_visible_text_empty_document() {
        assert_eq!(visible_text(""), "");
    }

    #[test]
    fn test_document_title() {
        let html = "<html><head><title> Season 4 results </title></head><body></body></html>";
        assert_eq!(document_title(html).as_deref(), Some("Season 4 results"));
        assert_eq!(document_title("<p>no title</p>"), None);
    }
}
