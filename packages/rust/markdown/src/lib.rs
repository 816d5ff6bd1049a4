//! HTML-to-prose extraction for language-model input.
//!
//! Converts a fetched HTML page into compact Markdown flow text using the
//! `htmd` crate, after dropping page chrome (navigation, headers, footers,
//! sidebars, scripts). A cleanup pipeline then removes link targets, stray
//! tags and excess whitespace so the model sees only readable content.

mod cleanup;

use std::sync::LazyLock;

use htmd::options::{CodeBlockStyle, HeadingStyle, Options};
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use icebreaker_shared::{IcebreakerError, Result};

/// Number of characters of extracted text forwarded to the language model.
pub const MAX_MODEL_INPUT_CHARS: usize = 10_000;

/// Subtrees removed before conversion.
const STRIPPED_TAGS: [&str; 11] = [
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg", "form",
    "template",
];

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Extract readable Markdown text from an HTML document.
///
/// Returns an empty string when the page has no readable content or the
/// conversion fails; this function never errors.
#[instrument(skip_all, fields(html_len = html.len()))]
pub fn extract_text(html: &str) -> String {
    match try_extract(html) {
        Ok(text) if text.trim().is_empty() => String::new(),
        Ok(text) => {
            debug!(text_len = text.len(), "content extracted");
            text
        }
        Err(e) => {
            warn!(error = %e, "content extraction failed");
            String::new()
        }
    }
}

fn try_extract(html: &str) -> Result<String> {
    let content_html = body_inner_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .skip_tags(STRIPPED_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| IcebreakerError::Conversion(format!("htmd conversion failed: {e}")))?;

    Ok(cleanup::run_pipeline(&raw_markdown))
}

/// Inner markup of `<body>`, or the whole document when there is none.
fn body_inner_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    match doc.select(&BODY_SEL).next() {
        Some(body) => body.inner_html(),
        None => html.to_string(),
    }
}

/// The first `max_chars` characters of `text` (never splits a character).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
