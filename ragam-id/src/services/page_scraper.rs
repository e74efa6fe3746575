//! Raga page scraping
//!
//! A [`PageRenderer`] hands out disposable [`RenderSession`]s. Every session
//! acquired by [`render_visible_text`] is closed before it returns, whether
//! rendering succeeded, failed, or panicked.

use async_trait::async_trait;
use futures::FutureExt;
use scraper::{
    node::{Element, Node},
    ElementRef, Html,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("ragam-id/", env!("CARGO_PKG_VERSION"));

/// Not rendered as text
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Text kept verbatim, line breaks included
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Start and end on their own line
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "center", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "thead",
    "tfoot", "tr", "ul",
];

/// Rendering failures. A page that loads but mentions no raga is not one of these.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page returned HTTP {0}")]
    Status(u16),

    #[error("Render failed: {0}")]
    Render(String),
}

/// Outcome of the raga line heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagaFinding {
    /// First matching line, trimmed
    Found(String),
    NotFound,
}

impl RagaFinding {
    pub fn is_found(&self) -> bool {
        matches!(self, RagaFinding::Found(_))
    }

    pub fn line(&self) -> Option<&str> {
        match self {
            RagaFinding::Found(line) => Some(line),
            RagaFinding::NotFound => None,
        }
    }
}

/// Source of disposable rendering contexts
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScrapeError>;
}

/// One rendering context. `close` must be safe to call on any state.
#[async_trait]
pub trait RenderSession: Send {
    /// Load `url` and return the visible text of its body
    async fn body_text(&mut self, url: &str) -> Result<String, ScrapeError>;

    async fn close(&mut self);
}

/// Acquire a session, render, and release the session on every path
pub async fn render_visible_text(renderer: &dyn PageRenderer, url: &str) -> Result<String, ScrapeError> {
    let mut session = renderer.launch().await?;

    let outcome = AssertUnwindSafe(session.body_text(url)).catch_unwind().await;
    session.close().await;

    match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!(renderer = renderer.source_id(), url = %url, "Renderer panicked");
            Err(ScrapeError::Render("renderer panicked".to_string()))
        }
    }
}

/// Render `url` and apply the raga line heuristic
pub async fn scrape_raga(renderer: &dyn PageRenderer, url: &str) -> Result<RagaFinding, ScrapeError> {
    let text = render_visible_text(renderer, url).await?;
    let finding = find_raga_line(&text);

    match &finding {
        RagaFinding::Found(line) => info!(url = %url, line = %line, "Raga line found"),
        RagaFinding::NotFound => info!(url = %url, "Page has no raga line"),
    }
    Ok(finding)
}

/// Non-empty trimmed lines in document order
pub fn visible_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn is_raga_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("ragam") || lower.contains("raagam")
}

/// First line mentioning "ragam" or "raagam", case-insensitively
pub fn find_raga_line(text: &str) -> RagaFinding {
    visible_lines(text)
        .find(|line| is_raga_line(line))
        .map(|line| RagaFinding::Found(line.to_string()))
        .unwrap_or(RagaFinding::NotFound)
}

/// Approximate the browser's `innerText` of `<body>`: whitespace inside text
/// runs collapses except under `<pre>`/`<textarea>`, block elements and `<br>`
/// break lines, table cells are tab-separated, and script/style content and
/// hidden elements are dropped.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out, false);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String, preformatted: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) if preformatted => out.push_str(text),
            Node::Text(text) => push_collapsed(out, text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) || is_hidden(el) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    let preformatted = preformatted || PREFORMATTED_ELEMENTS.contains(&name);
                    collect_text(child_element, out, preformatted);
                }
                if block {
                    out.push('\n');
                } else if name == "td" || name == "th" {
                    out.push('\t');
                }
            }
            _ => {}
        }
    }
}

/// `hidden` attribute, or an inline style that takes the element out of view
fn is_hidden(el: &Element) -> bool {
    if el.attr("hidden").is_some() {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut last_was_space = out.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
}

/// Fetches the document over HTTP and parses it into a DOM. No scripts run;
/// the text is what a browser has once the DOM content is loaded.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn source_id(&self) -> &'static str {
        "http"
    }

    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| ScrapeError::Render(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client: Some(client),
        }))
    }
}

struct HttpSession {
    client: Option<reqwest::Client>,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn body_text(&mut self, url: &str) -> Result<String, ScrapeError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ScrapeError::Render("session already closed".to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

        debug!(url = %url, bytes = html.len(), "Page loaded");
        Ok(extract_visible_text(&html))
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

/// Shared handle type used by the pipeline
pub type SharedRenderer = Arc<dyn PageRenderer>;
