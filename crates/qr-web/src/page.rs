//! Page fetching and HTML cleaning.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};

use qr_core::{run_blocking, Error, PageFetcher};

/// Elements whose whole subtree is dropped before text extraction.
const STRIPPED_TAGS: &[&str] = &["script", "style", "header", "footer", "nav", "meta", "link"];

#[derive(Clone, Debug)]
pub struct PageFetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for PageFetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("qr/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PageFetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fetches result pages over HTTP and returns their cleaned body text.
pub struct HttpPageFetcher {
    client: Client,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new(PageFetchConfig::default())
    }
}

impl HttpPageFetcher {
    pub fn new(config: PageFetchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent)
                .timeout(config.timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn try_fetch(&self, url: &str) -> Result<String, Error> {
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&format!("Failed to fetch '{}'", url), &e, e.is_timeout()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(status.as_u16(), format!("HTTP error fetching {}", url)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest("Failed to read page body", &e, e.is_timeout()))?;
        debug!(url, bytes = html.len(), "Page downloaded");

        let text = run_blocking(move || extract_body_text(&html))
            .await?
            .ok_or_else(|| Error::parse(format!("No <body> element in {}", url)))?;

        info!(
            url,
            chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched and cleaned page"
        );
        Ok(text)
    }
}

/// Extract the readable text of a document's `<body>`.
///
/// Drops script, style, header, footer, nav, meta and link subtrees, then
/// collapses every whitespace run to a single space. Returns `None` when the
/// document has no body.
pub fn extract_body_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").ok()?;
    let body = document.select(&body_selector).next()?;

    let mut raw = String::new();
    // Nesting depth is page-controlled; walk with an explicit stack.
    let mut pending = vec![*body];
    while let Some(node) = pending.pop() {
        if let Some(element) = node.value().as_element() {
            if STRIPPED_TAGS.contains(&element.name()) {
                continue;
            }
        } else if let Some(text) = node.value().as_text() {
            raw.push_str(text);
            raw.push(' ');
            continue;
        }
        pending.extend(node.children().rev());
    }

    Some(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}
