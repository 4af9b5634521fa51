//! Gemini client for the three suggestion operations.
//!
//! Error policy is deliberately asymmetric: `suggest_tasks` is the one
//! user-triggered call, so its failures propagate; `categorize` and
//! `suggest_categories` run as background conveniences and degrade to
//! "General" / an empty list with only a tracing record.

use anyhow::{Context, Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use tally_core::{
    FALLBACK_CATEGORY, Task, category_candidates_prompt, category_prompt, parse_string_array,
    sanitize_category, suggestion_prompt,
};

use crate::auth;
use crate::config::GeminiSection;

#[derive(Serialize)]
struct Req {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Schema,
}

#[derive(Serialize)]
struct Schema {
    #[serde(rename = "type")]
    t: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<Schema>>,
}

fn string_array_schema() -> Schema {
    Schema {
        t: "ARRAY".to_string(),
        items: Some(Box::new(Schema {
            t: "STRING".to_string(),
            items: None,
        })),
    }
}

#[derive(Deserialize)]
struct Resp {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}

#[derive(Deserialize)]
struct RespContent {
    parts: Option<Vec<RespPart>>,
}

#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

/// Concatenated text of the first candidate, trimmed.
fn response_text(resp: Resp) -> String {
    let mut s = String::new();
    for c in resp.candidates.unwrap_or_default() {
        let parts = c.content.and_then(|c| c.parts).unwrap_or_default();
        for p in parts {
            if let Some(t) = p.text {
                s.push_str(&t);
            }
        }
        break;
    }
    s.trim().to_string()
}

/// One generateContent round trip. `constrain_to_string_array` asks the
/// model for a JSON array-of-strings response shape.
async fn generate_content(
    cfg: &GeminiSection,
    key: &str,
    prompt: &str,
    constrain_to_string_array: bool,
) -> Result<String> {
    let body = Req {
        contents: vec![Content {
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        generation_config: constrain_to_string_array.then(|| GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: string_array_schema(),
        }),
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-goog-api-key", HeaderValue::from_str(key)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        cfg.base_url.trim_end_matches('/'),
        cfg.model
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(url)
        .headers(headers)
        .json(&body)
        .send()
        .await
        .context("gemini request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("gemini error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse gemini response")?;
    Ok(response_text(out))
}

/// Fetch new-task suggestions for the current list. Errors propagate: this
/// is the explicitly user-triggered operation and its failure must be
/// reported, not papered over.
pub async fn suggest_tasks(cfg: &GeminiSection, tasks: &[Task]) -> Result<Vec<String>> {
    let key = auth::resolve_api_key()?;
    let raw = generate_content(cfg, &key, &suggestion_prompt(tasks), true).await?;
    parse_string_array(&raw).context("gemini returned an unexpected suggestion format")
}

/// Best-effort single category for a task's text. Never fails: any problem
/// (missing key, transport, empty reply) degrades to "General".
pub async fn categorize(cfg: &GeminiSection, text: &str) -> String {
    match try_categorize(cfg, text).await {
        Ok(category) => category,
        Err(e) => {
            tracing::warn!("categorization fell back to {FALLBACK_CATEGORY}: {e:#}");
            FALLBACK_CATEGORY.to_string()
        }
    }
}

async fn try_categorize(cfg: &GeminiSection, text: &str) -> Result<String> {
    let key = auth::resolve_api_key()?;
    let raw = generate_content(cfg, &key, &category_prompt(text), false).await?;
    Ok(sanitize_category(&raw))
}

/// Best-effort candidate categories for a task's text. Never fails: any
/// problem degrades to an empty list.
pub async fn suggest_categories(cfg: &GeminiSection, text: &str) -> Vec<String> {
    match try_suggest_categories(cfg, text).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!("category suggestions unavailable: {e:#}");
            Vec::new()
        }
    }
}

async fn try_suggest_categories(cfg: &GeminiSection, text: &str) -> Result<Vec<String>> {
    let key = auth::resolve_api_key()?;
    let raw = generate_content(cfg, &key, &category_candidates_prompt(text), true).await?;
    parse_string_array(&raw).context("gemini returned an unexpected category format")
}
