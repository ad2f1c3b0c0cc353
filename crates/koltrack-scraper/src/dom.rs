//! Synchronous CSS-selector helpers over rendered HTML.
//!
//! `scraper::Html` is not `Send`, so documents are parsed inside each call
//! rather than held across await points by the session.

use scraper::{Html, Selector};

/// Trimmed text content of the first element matching `selector`.
/// `None` for no match, empty text, or an invalid selector.
pub(crate) fn select_text(html: &str, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let doc = Html::parse_document(html);
    let element = doc.select(&sel).next()?;
    let text: String = element.text().collect::<String>().trim().to_owned();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Attribute value of the first element matching `selector`.
pub(crate) fn select_attr(html: &str, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let doc = Html::parse_document(html);
    let element = doc.select(&sel).next()?;
    element.value().attr(attr).map(str::to_owned)
}

/// Whether any element matches `selector`.
pub(crate) fn exists(html: &str, selector: &str) -> bool {
    let Ok(sel) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(html).select(&sel).next().is_some()
}

/// Number of elements matching `selector`.
pub(crate) fn count(html: &str, selector: &str) -> usize {
    let Ok(sel) = Selector::parse(selector) else {
        return 0;
    };
    Html::parse_document(html).select(&sel).count()
}

/// Trimmed non-empty texts of every element matching `selector`.
pub(crate) fn select_texts(html: &str, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    Html::parse_document(html)
        .select(&sel)
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whitespace-normalized text of the whole document, for full-text
/// pattern fallbacks.
pub(crate) fn full_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let text: Vec<&str> = doc.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<html><head><meta property="og:title" content="Jane"></head>
        <body><h1 class="name"> Jane Doe </h1><span data-e2e="followers-count">1.5K</span></body></html>"#;

    #[test]
    fn select_text_trims_and_finds_first() {
        assert_eq!(select_text(DOC, "h1.name").as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn select_text_none_for_missing_element() {
        assert!(select_text(DOC, ".absent").is_none());
    }

    #[test]
    fn select_attr_reads_meta_content() {
        assert_eq!(
            select_attr(DOC, "meta[property=\"og:title\"]", "content").as_deref(),
            Some("Jane")
        );
    }

    #[test]
    fn invalid_selector_is_absorbed() {
        assert!(select_text(DOC, ":::nonsense").is_none());
        assert!(!exists(DOC, ":::nonsense"));
    }

    #[test]
    fn count_and_texts_cover_all_matches() {
        let doc = "<ul><li>a</li><li> b </li><li></li></ul>";
        assert_eq!(count(doc, "li"), 3);
        assert_eq!(select_texts(doc, "li"), vec!["a", "b"]);
    }

    #[test]
    fn full_text_normalizes_whitespace() {
        let text = full_text(DOC);
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("1.5K"));
    }
}
