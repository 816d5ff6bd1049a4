//! Icebreaker synthesis from page abstracts.

use tracing::{instrument, warn};

use icebreaker_shared::Lead;

use crate::llm::{ChatModel, ChatRequest, json_string_field};
use crate::pipeline::ModelSettings;
use crate::summarize::PageAbstract;

/// Fixed opener. The model only fills the four `{...}` slots.
pub const ICEBREAKER_TEMPLATE: &str = "Hey {name} — went down a rabbit hole on {ShortCompanyName}'s site. The part about {specific_niche_detail} caught my eye. Your focus on {core_value_or_theme} stuck with me.";

const SYSTEM_PROMPT: &str =
    "You're a helpful, intelligent sales assistant writing personalized cold outreach.";

/// Write a one-paragraph icebreaker for `lead` grounded in `abstracts`.
///
/// `None` on any model or parse failure, and without a model call when there
/// is nothing to ground the icebreaker in.
#[instrument(skip_all, fields(email = %lead.email, abstracts = abstracts.len()))]
pub async fn synthesize_icebreaker(
    model: &dyn ChatModel,
    settings: &ModelSettings,
    lead: &Lead,
    abstracts: &[PageAbstract],
) -> Option<String> {
    if abstracts.is_empty() {
        return None;
    }

    let request = ChatRequest::json(
        &settings.model,
        settings.temperature,
        SYSTEM_PROMPT,
        build_prompt(lead, abstracts),
    );

    let reply = match model.complete(request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "icebreaker call failed");
            return None;
        }
    };

    let icebreaker = json_string_field(&reply, "icebreaker");
    if icebreaker.is_none() {
        warn!("icebreaker reply missing \"icebreaker\"");
    }
    icebreaker
}

fn build_prompt(lead: &Lead, abstracts: &[PageAbstract]) -> String {
    let website_content = abstracts
        .iter()
        .map(|a| a.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut profile = format!(
        "First name: {}\nLast name: {}\n",
        lead.first_name.trim(),
        lead.last_name.trim()
    );
    if let Some(title) = lead.title.as_deref().filter(|t| !t.trim().is_empty()) {
        profile.push_str(&format!("Headline: {}\n", title.trim()));
    }
    if let Some(company) = lead.company_name.as_deref().filter(|c| !c.trim().is_empty()) {
        profile.push_str(&format!("Company: {}\n", company.trim()));
    }

    format!(
        "We just scraped a series of web pages for a business. Your task is to \
         take their summaries and turn them into a catchy, personalized icebreaker that \
         opens a cold email.\n\
         \n\
         Use this exact template and only fill in the placeholders:\n\
         \"{ICEBREAKER_TEMPLATE}\"\n\
         \n\
         Rules:\n\
         - {{name}} is the prospect's first name.\n\
         - Shorten the company name to one word where possible (\"Maverick\" instead of \
         \"Maverick Digital Agency\", \"Grio\" instead of \"Grio Agency\").\n\
         - {{specific_niche_detail}} must be one concrete, non-obvious detail taken from \
         the summaries.\n\
         - {{core_value_or_theme}} must be a value or theme that recurs across the summaries.\n\
         - Everything you write must be traceable to the summaries. Do not invent facts.\n\
         - Keep a calm, founder-to-founder tone. No flattery, no exclamation marks.\n\
         - Never change the fixed wording of the template.\n\
         \n\
         Return a JSON object in this format: {{\"icebreaker\": \"Hey {{name}} — ...\"}}\n\
         \n\
         Prospect profile:\n\
         {profile}\n\
         Website summaries:\n\
         {website_content}"
    )
}
