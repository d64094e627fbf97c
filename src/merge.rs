use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{TemplateError, TemplateResult};

/// Values substituted into `{{name}}` placeholders.
pub type MergeContext = HashMap<String, String>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.+?\}\}").unwrap());

/// Returns `true` when the text contains at least one `{{...}}` sequence.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

/// Substitute every placeholder in `text` with its value from `context`.
///
/// Placeholders may appear anywhere: request line, headers (Host included)
/// and body. Both `{{name}}` and `{{.name}}` are accepted, surrounding
/// whitespace inside the braces is ignored.
///
/// Text without placeholders is returned unchanged.
///
/// # Errors
///
/// [`TemplateError::Parse`] for an unterminated `{{` or an empty/invalid
/// name, [`TemplateError::Merge`] when a name has no value in `context`.
pub fn merge(text: &str, context: &MergeContext) -> TemplateResult<String> {
    if !has_placeholders(text) {
        return Ok(text.to_string());
    }

    let mut merged = String::with_capacity(text.len());
    let mut rest = text;
    let mut substituted = 0usize;
    while let Some(start) = rest.find(OPEN) {
        let (prefix, tail) = rest.split_at(start);
        merged.push_str(prefix);
        let end = tail[OPEN.len()..].find(CLOSE).ok_or_else(|| {
            TemplateError::Parse(format!("unterminated placeholder near {:?}", preview(tail)))
        })?;
        let name = placeholder_name(&tail[OPEN.len()..OPEN.len() + end])?;
        let value = context
            .get(name)
            .ok_or_else(|| TemplateError::Merge(name.to_string()))?;
        merged.push_str(value);
        substituted += 1;
        rest = &tail[OPEN.len() + end + CLOSE.len()..];
    }
    merged.push_str(rest);

    debug!(substituted, "merged template variables");
    Ok(merged)
}

fn placeholder_name(raw: &str) -> TemplateResult<&str> {
    let trimmed = raw.trim();
    let name = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if name.is_empty() {
        return Err(TemplateError::Parse(format!("empty placeholder {{{{{}}}}}", raw)));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(TemplateError::Parse(format!("invalid placeholder name {:?}", name)));
    }
    Ok(name)
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(24)
        .map(|(i, _)| i)
        .unwrap_or_else(|| text.len());
    &text[..end]
}
