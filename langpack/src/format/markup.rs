//! Rich-text markup validation.
//!
//! Localized messages rendered as HTML may only contain an allow-listed set
//! of tags. A disallowed tag is a programmer error in the message catalog and
//! is reported, never silently stripped.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Tags permitted in rich-text messages by default.
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &["b", "br", "em", "i", "p", "strong", "span"];

/// Tags that never take a closing tag.
const VOID_TAGS: &[&str] = &["br"];

/// Errors from markup validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// A tag outside the allow-list.
    #[error("tag <{tag}> is not allowed in localized markup")]
    DisallowedTag { tag: String },

    /// A closing tag without its opening tag, or an unclosed tag.
    #[error("unbalanced tag <{tag}> in localized markup")]
    Unbalanced { tag: String },
}

/// Tag pattern.
///
/// Captures:
/// - Group 1: `/` for closing tags
/// - Group 2: tag name
/// - Group 3: `/` for self-closing tags
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<\s*(/)?\s*([A-Za-z][A-Za-z0-9-]*)(?:\s+[^<>]*?)?\s*(/)?\s*>"#).unwrap()
    })
}

/// Check that `text` only uses `allowed` tags and that they nest properly.
pub fn validate_markup(text: &str, allowed: &[&str]) -> Result<(), MarkupError> {
    let mut open: Vec<String> = Vec::new();

    for captures in tag_pattern().captures_iter(text) {
        let closing = captures.get(1).is_some();
        let self_closing = captures.get(3).is_some();
        let tag = captures[2].to_ascii_lowercase();

        if !allowed.contains(&tag.as_str()) {
            return Err(MarkupError::DisallowedTag { tag });
        }

        if VOID_TAGS.contains(&tag.as_str()) || self_closing {
            continue;
        }

        if closing {
            match open.pop() {
                Some(top) if top == tag => {}
                _ => return Err(MarkupError::Unbalanced { tag }),
            }
        } else {
            open.push(tag);
        }
    }

    match open.pop() {
        Some(tag) => Err(MarkupError::Unbalanced { tag }),
        None => Ok(()),
    }
}
