//! Web fetching and markup stripping.
//!
//! The fetcher is a thin reqwest client with a fixed timeout ceiling;
//! all markup handling (title extraction, tag stripping, entity
//! decoding) happens here in the core rather than in the collaborator.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use quaero_core::{Result, WebFetcher, WebReference};

/// Reqwest-backed page fetcher with a fixed timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(quaero_core::Error::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching page");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Extract the page title and a plain-text body from raw HTML.
///
/// Script/style blocks are removed entirely, remaining tags stripped,
/// common entities decoded, and whitespace collapsed.
pub fn strip_html(html: &str) -> (Option<String>, String) {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
        .unwrap()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
        .filter(|t| !t.is_empty());

    let without_blocks = Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
        .unwrap()
        .replace_all(html, " ");
    let without_tags = Regex::new(r"(?s)<[^>]+>")
        .unwrap()
        .replace_all(&without_blocks, " ");
    let text = collapse_whitespace(&decode_entities(&without_tags));

    (title, text)
}

/// Build a web reference from a fetched page.
pub fn page_to_reference(url: &str, query: &str, html: &str) -> WebReference {
    let (title, text) = strip_html(html);
    WebReference {
        url: url.to_string(),
        title: title.unwrap_or_else(|| url.to_string()),
        excerpt: text.chars().take(500).collect(),
        full_text: Some(text),
        query: query.to_string(),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
<head><title>  Release &amp; Deploy Notes </title>
<style>body { color: red; }</style>
<script>console.log("<ignored>");</script></head>
<body>
  <h1>Deploy guide</h1>
  <p>Step one: build the artifact.</p>
  <p>Step two:&nbsp;ship it.</p>
</body></html>"#;

    #[test]
    fn test_title_extraction() {
        let (title, _) = strip_html(PAGE);
        assert_eq!(title.as_deref(), Some("Release & Deploy Notes"));
    }

    #[test]
    fn test_script_and_style_removed() {
        let (_, text) = strip_html(PAGE);
        assert!(!text.contains("console.log"));
        assert!(!text.contains("color: red"));
        assert!(text.contains("Deploy guide"));
        assert!(text.contains("Step one: build the artifact."));
    }

    #[test]
    fn test_entities_decoded_and_whitespace_collapsed() {
        let (_, text) = strip_html(PAGE);
        assert!(text.contains("Step two: ship it."));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_missing_title() {
        let (title, text) = strip_html("<body><p>no title here</p></body>");
        assert!(title.is_none());
        assert_eq!(text, "no title here");
    }

    #[test]
    fn test_page_to_reference_falls_back_to_url_title() {
        let reference = page_to_reference("https://x.test/page", "query", "<p>body</p>");
        assert_eq!(reference.title, "https://x.test/page");
        assert_eq!(reference.excerpt, "body");
        assert_eq!(reference.query, "query");
    }

    #[test]
    fn test_excerpt_capped_at_500_chars() {
        let html = format!("<p>{}</p>", "word ".repeat(300));
        let reference = page_to_reference("https://x.test", "q", &html);
        assert!(reference.excerpt.chars().count() <= 500);
        assert!(reference.full_text.unwrap().len() > 500);
    }

    #[test]
    fn test_plain_text_input_untouched() {
        let (title, text) = strip_html("just plain text");
        assert!(title.is_none());
        assert_eq!(text, "just plain text");
    }
}
