//! Candidate language lists.
//!
//! Candidates are ordered most-specific user preference first:
//! `[primary, primary_base, fallback, fallback_base, "en-us", "en"]`.
//! Tags are normalized to lower case with `-` separators and de-duplicated,
//! keeping the first occurrence.

/// Languages appended to every candidate list.
pub const TERMINAL_LANGUAGES: [&str; 2] = ["en-us", "en"];

/// Minimum tag length for override lookups (`ll-rr`).
pub const REGION_TAG_MIN_LEN: usize = 5;

/// Normalize a locale tag: trim, lower-case, `_` → `-`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase().replace('_', "-")
}

/// The base subtag of a locale tag (`"el-GR"` → `"el"`).
pub fn base_language(tag: &str) -> String {
    let tag = normalize_tag(tag);
    match tag.split_once('-') {
        Some((base, _)) => base.to_string(),
        None => tag,
    }
}

/// Whether a tag carries a region and so qualifies for override lookup.
pub fn is_region_qualified(tag: &str) -> bool {
    tag.len() >= REGION_TAG_MIN_LEN
}

/// Build the candidate list from document locale settings.
///
/// # Example
///
/// ```
/// use langpack::resolve::candidate_languages;
///
/// let candidates = candidate_languages("el-GR", Some("en-GB"));
/// assert_eq!(candidates, vec!["el-gr", "el", "en-gb", "en", "en-us"]);
/// ```
pub fn candidate_languages(primary: &str, fallback: Option<&str>) -> Vec<String> {
    let mut raw = vec![primary.to_string(), base_language(primary)];
    if let Some(fallback) = fallback {
        raw.push(fallback.to_string());
        raw.push(base_language(fallback));
    }
    raw.extend(TERMINAL_LANGUAGES.iter().map(|s| s.to_string()));
    normalize_candidates(raw)
}

/// Normalize and de-duplicate a caller-supplied candidate list, keeping
/// order and the first occurrence of each tag. Empty tags are dropped.
pub fn normalize_candidates<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in candidates {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
