//! Website discovery: scheme normalization and candidate link selection.
//!
//! Given a lead's raw website string and the HTML of its homepage, this crate
//! decides which URL to fetch first and which (at most three) internal pages
//! are worth visiting after it.

mod links;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};

pub use links::{MAX_CANDIDATE_LINKS, normalize_links};

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Give a raw website string an explicit scheme.
///
/// `grioagency.com` becomes `https://grioagency.com`; values that already
/// start with `http` (any case) are only trimmed.
pub fn normalize_website(raw: &str) -> String {
    let trimmed = raw.trim();
    let has_scheme = trimmed
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("http"));

    if has_scheme {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Collect every non-empty `<a href>` value in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    doc.select(&ANCHOR_SEL)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from)
        .collect()
}

/// Extract and normalize candidate links from a fetched homepage.
#[instrument(skip(html))]
pub fn discover_links(html: &str, base_url: &str) -> Vec<String> {
    let hrefs = extract_hrefs(html);
    let links = normalize_links(&hrefs, base_url);
    debug!(found = hrefs.len(), selected = links.len(), "candidate links discovered");
    links
}
