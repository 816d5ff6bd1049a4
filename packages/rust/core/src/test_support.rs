//! Scripted `PageFetcher` / `ChatModel` doubles for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use icebreaker_crawler::PageFetcher;
use icebreaker_shared::{IcebreakerError, Lead, Result};

use crate::llm::{ChatModel, ChatRequest};

pub(crate) fn lead() -> Lead {
    Lead {
        first_name: "Junior".into(),
        last_name: "Nyemb".into(),
        title: None,
        company_name: None,
        email: "junior@grioagency.com".into(),
        website: "grioagency.com".into(),
    }
}

fn key(url: &str) -> String {
    Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

/// Serves canned HTML by URL and records every request in order.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    pages: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(key(url), html.into());
        self
    }

    pub(crate) fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(key(url), delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Option<String> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.pages.get(url.as_str()).cloned()
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String> + Send + Sync>;

/// Answers chat requests with a closure and records every request.
pub(crate) struct ScriptedModel {
    respond: Responder,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Same reply to every request.
    pub(crate) fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub(crate) fn failing() -> Self {
        Self::new(|_| Err(IcebreakerError::Model("HTTP 500: upstream unavailable".into())))
    }

    pub(crate) fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let reply = (self.respond)(&request);
        self.calls.lock().unwrap().push(request);
        reply
    }
}

/// Model that summarizes each page as `Abstract of <marker>`, where the
/// marker is the first `marker-…` word in the page text. Markers containing
/// `empty` get the "no content" reply. Icebreaker requests (model
/// `test-icebreaker`) get a fixed greeting.
pub(crate) fn page_model() -> ScriptedModel {
    ScriptedModel::new(|req| {
        if req.model == "test-icebreaker" {
            return Ok(
                r#"{"icebreaker": "Hey Junior — went down a rabbit hole on Grio's site."}"#
                    .to_string(),
            );
        }

        let content = req.user_content();
        let marker = content
            .find("marker-")
            .map(|start| {
                content[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .unwrap_or_default();

        let summary = if marker.is_empty() || marker.contains("empty") {
            "no content".to_string()
        } else {
            format!("Abstract of {marker}")
        };
        Ok(serde_json::json!({ "abstract": summary }).to_string())
    })
}
