//! `{{name}}` placeholder handling.

use std::collections::HashMap;
use std::sync::LazyLock;
use regex::{Captures, Regex};

/// Payload may not contain braces, so placeholders never nest or span each other.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is valid"));

pub fn unresolved_marker(name: &str) -> String {
    format!("[{} UNRESOLVED]", name)
}

/// Replace every placeholder in `content` with its value in `resolved`.
///
/// Names missing from `resolved` become an unresolved marker. Empty payloads
/// (`{{}}`, `{{  }}`) are not placeholders and are copied through. This is a
/// single pass: text coming from `resolved` is never scanned again.
pub fn substitute(content: &str, resolved: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &Captures| {
            let name = caps[1].trim();
            if name.is_empty() {
                return caps[0].to_string();
            }
            match resolved.get(name) {
                Some(value) => value.clone(),
                None => unresolved_marker(name),
            }
        })
        .into_owned()
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let name = caps[1].trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
