//! Bounded, failure-absorbing page fetcher.
//!
//! Every failure mode (DNS, TLS, timeout, redirect loop, non-2xx status,
//! oversized body, blocked target or blocked redirect hop) collapses into
//! `None`.
//! A missing page is an expected outcome for lead enrichment, not an error.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};
use url::Url;

use icebreaker_shared::{FetchConfig, IcebreakerError, Result};

/// Maximum response size we are willing to read (10 MiB).
const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Retrieves the HTML of a page.
///
/// Implementations must never fail loudly: `None` means "no usable page".
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<String>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// `reqwest`-backed fetcher with a browser identity, timeout and redirect cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl HttpFetcher {
    /// Build a fetcher from runtime fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(config.max_redirects, config.allow_private_hosts))
            .timeout(config.timeout)
            .build()
            .map_err(|e| IcebreakerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    async fn fetch_body(&self, url: &Url) -> Result<String> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            return Err(IcebreakerError::validation(format!(
                "{url}: blocked private or non-HTTP target"
            )));
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| IcebreakerError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IcebreakerError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_BODY_BYTES {
                return Err(IcebreakerError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_BODY_BYTES})"
                )));
            }
        }

        read_capped(response, MAX_BODY_BYTES).await
    }
}

/// Follow at most `max_redirects` hops, refusing any hop into private space
/// unless `allow_private_hosts` is set.
fn redirect_policy(max_redirects: usize, allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            attempt.error(format!("too many redirects (max {max_redirects})"))
        } else if !allow_private_hosts && is_ssrf_target(attempt.url()) {
            let target = attempt.url().to_string();
            attempt.error(format!("redirect to blocked target {target}"))
        } else {
            attempt.follow()
        }
    })
}

/// Read the body chunk by chunk, giving up as soon as it exceeds `max_bytes`.
///
/// Covers responses without a `Content-Length` (chunked transfer).
async fn read_capped(mut response: Response, max_bytes: u64) -> Result<String> {
    let url = response.url().clone();
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| IcebreakerError::Network(format!("{url}: body read failed: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(IcebreakerError::validation(format!(
                "{url}: response too large (over {max_bytes} bytes)"
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Option<String> {
        match self.fetch_body(url).await {
            Ok(body) => {
                debug!(bytes = body.len(), "page fetched");
                Some(body)
            }
            Err(e) => {
                warn!(error = %e, "page fetch failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
