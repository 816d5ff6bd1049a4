//! Candidate link normalization.
//!
//! Turns the raw `href` values of a homepage into a short, ordered list of
//! same-site, root-relative paths worth visiting.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

/// Upper bound on candidate paths returned by [`normalize_links`].
pub const MAX_CANDIDATE_LINKS: usize = 3;

/// Normalize raw hrefs found on the page at `base_url` into candidate paths.
///
/// - `/path` hrefs are kept verbatim.
/// - `http(s)://` hrefs are kept only when their host matches the base host
///   (a leading `www.` is ignored on both sides); their path is kept with a
///   single trailing slash removed.
/// - `//host/path` hrefs are read with the base scheme and treated as absolute.
/// - Everything else (`mailto:`, `javascript:`, `#frag`, `relative/path`) is dropped.
///
/// The result is deduplicated in first-seen order and capped at
/// [`MAX_CANDIDATE_LINKS`]. An unparsable base URL yields an empty list.
pub fn normalize_links<I, S>(hrefs: I, base_url: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let Ok(base) = Url::parse(base_url) else {
        debug!(base_url, "unparsable base URL, no candidate links");
        return Vec::new();
    };
    let Some(base_host) = base.host_str().map(site_host) else {
        debug!(base_url, "base URL has no host, no candidate links");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for href in hrefs {
        let Some(path) = candidate_path(href.as_ref().trim(), &base, &base_host) else {
            continue;
        };
        if seen.insert(path.clone()) {
            paths.push(path);
            if paths.len() == MAX_CANDIDATE_LINKS {
                break;
            }
        }
    }

    paths
}

/// Map a single href to a root-relative path, if it is a usable same-site link.
fn candidate_path(href: &str, base: &Url, base_host: &str) -> Option<String> {
    if href.starts_with("//") {
        let absolute = format!("{}:{href}", base.scheme());
        return same_site_path(&absolute, base_host);
    }

    if href.starts_with('/') {
        return Some(href.to_string());
    }

    if has_prefix_ignore_case(href, "http://") || has_prefix_ignore_case(href, "https://") {
        return same_site_path(href, base_host);
    }

    None
}

/// Parse an absolute URL and return its path if it lives on `base_host`.
fn same_site_path(absolute: &str, base_host: &str) -> Option<String> {
    let url = Url::parse(absolute).ok()?;
    let host = url.host_str()?;
    if site_host(host) != base_host {
        return None;
    }

    let path = url.path();
    let path = match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    };
    Some(path.to_string())
}

/// Host comparison key: lowercase, leading `www.` removed.
fn site_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
