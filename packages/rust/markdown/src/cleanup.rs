//! Post-conversion cleanup pipeline for extracted text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The goal is dense, readable prose: no link targets, no stray tags,
//! no runs of blank lines.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = normalize_headings(md);

    result = fix_code_block_languages(&result);
    result = map_outside_code_blocks(&result, strip_html_tags);
    result = map_outside_code_blocks(&result, unwrap_links);
    result = normalize_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep the first H1; demote later ones to H2.
///
/// Marketing sites often use several `<h1>`s; a single top heading keeps
/// the page subject obvious to the summarizer.
fn normalize_headings(md: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

    let mut seen_h1 = false;

    md.lines()
        .map(|line| match H_RE.captures(line) {
            Some(caps) if &caps[1] == "#" => {
                if seen_h1 {
                    format!("## {}", &caps[2])
                } else {
                    seen_h1 = true;
                    line.to_string()
                }
            }
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Code fences
// ---------------------------------------------------------------------------

/// Turn class-style fence hints (`language-js`, `lang-py`) into plain ones.
fn fix_code_block_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").to_string()
}

/// Apply `f` to every line that is not inside a fenced code block.
fn map_outside_code_blocks(md: &str, f: fn(&str) -> String) -> String {
    let mut in_code_block = false;

    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                line.to_string()
            } else {
                f(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Inline passes (applied per line, outside code)
// ---------------------------------------------------------------------------

/// Remove container tags that survived conversion, keeping their text.
fn strip_html_tags(line: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|main|aside|header|footer|figure|figcaption|details|summary|picture|source|button|label|br)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    HTML_TAG_RE.replace_all(line, "").to_string()
}

/// Drop images and replace `[text](target)` with `text`.
fn unwrap_links(line: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

    let without_images = IMAGE_RE.replace_all(line, "");
    LINK_RE.replace_all(&without_images, "$1").to_string()
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of blank lines into a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE
        .replace_all(md.trim_start_matches('\n'), "\n\n")
        .to_string()
}

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
