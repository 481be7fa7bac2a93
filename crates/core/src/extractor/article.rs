//! Article body extraction for feed sources.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

use super::types::{ArticleError, ArticleFetcher};
use crate::source::Item;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; recap/0.1)";

/// Fetches an article page and harvests paragraph text from `<article>`,
/// falling back to `<main>`.
pub struct ArticleExtractor {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Extract paragraph text from an HTML document.
///
/// Kept synchronous and separate from the fetch: `scraper::Html` is not
/// `Send` and must not live across an await point.
fn extract_paragraphs(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for container in ["article p", "main p"] {
        // Selectors are static and known-valid.
        let selector = Selector::parse(container).ok()?;
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return Some(paragraphs.join("\n"));
        }
    }
    None
}

#[async_trait]
impl ArticleFetcher for ArticleExtractor {
    async fn fetch_body(&self, item: &Item) -> Result<String, ArticleError> {
        let html = self
            .client
            .get(&item.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ArticleError::Fetch(e.to_string()))?
            .text()
            .await
            .map_err(|e| ArticleError::Fetch(e.to_string()))?;

        extract_paragraphs(&html).ok_or_else(|| ArticleError::NoContent(item.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_article_element() {
        let html = r#"
            <html><body>
                <nav><p>menu item</p></nav>
                <article>
                    <p>First paragraph.</p>
                    <p>Second paragraph.</p>
                </article>
            </body></html>"#;
        let body = extract_paragraphs(html).unwrap();
        assert_eq!(body, "First paragraph.\nSecond paragraph.");
        assert!(!body.contains("menu item"));
    }

    #[test]
    fn test_falls_back_to_main_element() {
        let html = r#"
            <html><body>
                <main><p>Main content here.</p></main>
            </body></html>"#;
        assert_eq!(extract_paragraphs(html).unwrap(), "Main content here.");
    }

    #[test]
    fn test_no_container_yields_none() {
        let html = "<html><body><div><p>floating text</p></div></body></html>";
        assert!(extract_paragraphs(html).is_none());
    }

    #[test]
    fn test_empty_paragraphs_are_skipped() {
        let html = "<article><p>  </p><p>real</p></article>";
        assert_eq!(extract_paragraphs(html).unwrap(), "real");
    }

    #[test]
    fn test_nested_markup_is_flattened() {
        let html = "<article><p>Hello <strong>bold</strong> world</p></article>";
        assert_eq!(extract_paragraphs(html).unwrap(), "Hello bold world");
    }
}
