// ABOUTME: ((placeholder)) substitution against cascading variable documents.
// ABOUTME: Later variable files override earlier ones; unresolved tokens stay verbatim.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use super::error::ManifestError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([^)]+)\)\)").expect("placeholder pattern is valid"));

/// Replace every `((name))` token in `text` with its value from the variable
/// documents.
///
/// Documents are scanned from last to first so that later files override
/// earlier ones; the first non-blank value wins. Tokens that resolve nowhere
/// are left verbatim — that is not an error, the worker may resolve them.
pub fn resolve_placeholders(text: &str, variable_yamls: &[String]) -> Result<String, ManifestError> {
    if !text.contains("((") {
        return Ok(text.to_string());
    }

    let documents = parse_variable_documents(variable_yamls)?;

    let mut resolved = text.to_string();
    for capture in PLACEHOLDER.captures_iter(text) {
        let name = &capture[1];
        if let Some(value) = lookup(&documents, name) {
            resolved = resolved.replace(&format!("(({name}))"), &value);
        }
    }

    Ok(resolved)
}

/// True if the text still carries an unresolved `((…))` token.
pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

fn parse_variable_documents(variable_yamls: &[String]) -> Result<Vec<Mapping>, ManifestError> {
    variable_yamls
        .iter()
        .map(|doc| serde_yaml::from_str::<Mapping>(doc).map_err(ManifestError::from))
        .collect()
}

fn lookup(documents: &[Mapping], name: &str) -> Option<String> {
    for doc in documents.iter().rev() {
        if let Some(value) = doc.get(Value::from(name)) {
            if let Some(text) = scalar_to_string(value) {
                if !text.trim().is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Render a scalar YAML value as the text it substitutes to.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
