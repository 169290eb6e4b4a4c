//! Placeholder rewriting between the local `:name` syntax and the remote `{{name}}` syntax.
//!
//! Both directions are plain text rewrites and are inverse of each other for
//! text whose only braces come from placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

// Placeholder names are ASCII word characters only; `:größe` is `:gr` followed by text.
static LOCAL_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r":((?-u:\w)+)").unwrap());
static REMOTE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{((?-u:\w)+)\}\}").unwrap());

/// Marker of an assignment whose translation is empty in a PHP language file.
const EMPTY_ASSIGNMENT: &str = "=> ''";

/// Rewrite every `:word` into `{{word}}`.
pub fn to_remote(content: &str) -> String {
    LOCAL_PLACEHOLDER
        .replace_all(content, "{{${1}}}")
        .into_owned()
}

/// Rewrite every `{{word}}` into `:word`.
pub fn to_local(content: &str) -> String {
    REMOTE_PLACEHOLDER.replace_all(content, ":${1}").into_owned()
}

/// Drop blank lines and lines assigning an empty translation.
///
/// Works line by line on the serialized file, so a file with nothing but empty
/// assignments collapses to its non-empty structural lines.
pub fn strip_empty_translations(content: &str) -> String {
    content
        .split('\n')
        .filter(|line| !line.trim().is_empty() && !line.contains(EMPTY_ASSIGNMENT))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything applied to a downloaded export before it is written locally.
pub fn prepare_download(content: &str) -> String {
    strip_empty_translations(&to_local(content))
}
