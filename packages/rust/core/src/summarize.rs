//! Per-page abstracts.

use tracing::{debug, instrument, warn};

use icebreaker_markdown::{MAX_MODEL_INPUT_CHARS, truncate_chars};

use crate::llm::{ChatModel, ChatRequest, json_string_field};
use crate::pipeline::ModelSettings;

/// Reply the model gives for a page with nothing worth summarizing.
pub const NO_CONTENT_SENTINEL: &str = "no content";

const SYSTEM_PROMPT: &str = "You're a helpful, intelligent website scraping assistant.";

/// A short summary of one fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAbstract {
    pub url: String,
    pub text: String,
}

/// Summarize one page's extracted text.
///
/// Returns `None` when the model call fails, the reply is not the expected
/// JSON, or the model reports that the page has no substantive content.
#[instrument(skip_all, fields(url = %url, text_len = text.len()))]
pub async fn summarize_page(
    model: &dyn ChatModel,
    settings: &ModelSettings,
    url: &str,
    text: &str,
) -> Option<PageAbstract> {
    let request = ChatRequest::json(
        &settings.model,
        settings.temperature,
        SYSTEM_PROMPT,
        build_prompt(text),
    );

    let reply = match model.complete(request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "summary call failed");
            return None;
        }
    };

    let Some(summary) = json_string_field(&reply, "abstract") else {
        warn!("summary reply missing \"abstract\"");
        return None;
    };

    if is_sentinel(&summary) {
        debug!("page has no substantive content");
        return None;
    }

    Some(PageAbstract {
        url: url.to_string(),
        text: summary,
    })
}

fn build_prompt(text: &str) -> String {
    let page = truncate_chars(text, MAX_MODEL_INPUT_CHARS);
    format!(
        "Your task is to take the text of a company web page and turn it into a \
         two-paragraph abstract of what the page says.\n\
         \n\
         Rules:\n\
         - Write in a spartan, direct tone. No filler, no marketing language.\n\
         - Do not add citations, links or footnotes.\n\
         - Keep concrete details: services, niches, clients, values, locations.\n\
         - If the page has no substantive content (only navigation, a login \
         wall, an error or a placeholder), set the abstract to \"{NO_CONTENT_SENTINEL}\".\n\
         \n\
         Return a JSON object in this format: {{\"abstract\": \"your abstract goes here\"}}\n\
         \n\
         Page text:\n\
         {page}"
    )
}

fn is_sentinel(summary: &str) -> bool {
    summary
        .trim()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(NO_CONTENT_SENTINEL)
}
