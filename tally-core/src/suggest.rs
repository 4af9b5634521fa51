//! Prompt construction and reply validation for the AI suggestion features.
//!
//! The model is an untyped external data source: everything it returns gets
//! shape-checked here before anyone trusts it. Transport lives in the CLI;
//! these functions stay pure so the contract is testable without a network.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use crate::task::Task;

/// Category applied whenever the model gives nothing usable.
pub const FALLBACK_CATEGORY: &str = "General";

/// How many new-task suggestions a fetch asks for.
pub const SUGGESTION_COUNT: usize = 3;

/// Upper bound on candidate categories per task.
pub const MAX_CATEGORY_CANDIDATES: usize = 5;

// Markdown emphasis the model likes to wrap single words in.
static MARKDOWN_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`]").expect("invalid emphasis pattern"));

/// Prompt for suggesting new tasks given the current list.
///
/// Tasks are listed with `[x]`/`[ ]` markers; an empty list switches to the
/// generic starter-task wording.
pub fn suggestion_prompt(tasks: &[Task]) -> String {
    let current = if tasks.is_empty() {
        "The list is empty. Suggest some common starting tasks like 'Create a grocery list' or \
         'Plan week's schedule'."
            .to_string()
    } else {
        tasks
            .iter()
            .map(|t| format!("- [{}] {}", if t.completed { 'x' } else { ' ' }, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Based on the following to-do list, suggest {SUGGESTION_COUNT} new, related, and \
         actionable tasks.\n\
         The tasks should be concise. Avoid suggesting tasks that are already on the list.\n\
         Return the suggestions as a JSON array of strings.\n\
         \n\
         Current Tasks:\n\
         {current}\n\
         \n\
         Your response must be a valid JSON array of strings, for example: \
         [\"New task 1\", \"New task 2\", \"New task 3\"].\n\
         Do not include any other text or markdown formatting in your response."
    )
}

/// Prompt for a single one-word category for one task.
pub fn category_prompt(task_text: &str) -> String {
    format!(
        "Categorize the following to-do task into a single word.\n\
         Examples: \"Personal\", \"Work\", \"Health\", \"Finance\", \"Shopping\", \"Home\", \
         \"Social\".\n\
         If unsure, use a general category like \"{FALLBACK_CATEGORY}\".\n\
         Return only the single category word as a plain string.\n\
         \n\
         Task: \"{task_text}\"\n\
         \n\
         Category:"
    )
}

/// Prompt for up to [`MAX_CATEGORY_CANDIDATES`] candidate categories.
pub fn category_candidates_prompt(task_text: &str) -> String {
    format!(
        "Suggest up to {MAX_CATEGORY_CANDIDATES} relevant, single-word categories for the \
         following to-do task.\n\
         Common categories include: \"Personal\", \"Work\", \"Health\", \"Finance\", \
         \"Shopping\", \"Home\", \"Social\", \"Urgent\".\n\
         Return the suggestions as a JSON array of strings.\n\
         \n\
         Task: \"{task_text}\"\n\
         \n\
         Your response must be a valid JSON array of strings, for example: \
         [\"Work\", \"Project\", \"Urgent\"].\n\
         Do not include any other text or markdown formatting in your response."
    )
}

/// Parse a model reply that must be a JSON array of strings.
///
/// A bare string, an object, or an array with non-string elements is an
/// error, never a coerced value.
pub fn parse_string_array(raw: &str) -> Result<Vec<String>> {
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|e| anyhow::anyhow!("reply is not JSON: {e}"))?;

    let serde_json::Value::Array(items) = value else {
        bail!("reply is not a JSON array");
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::String(s) => out.push(s),
            other => bail!("array element is not a string: {other}"),
        }
    }
    Ok(out)
}

/// Strip markdown emphasis and whitespace from a category reply; an empty
/// result falls back to [`FALLBACK_CATEGORY`].
pub fn sanitize_category(raw: &str) -> String {
    let cleaned = MARKDOWN_EMPHASIS.replace_all(raw, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        FALLBACK_CATEGORY.to_string()
    } else {
        cleaned.to_string()
    }
}
