use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^\w#@])#(\w+)").unwrap());
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^\w#@])@(\w+)").unwrap());

/// `#tag` runs in `text`, lowercased, without the sigil, first-seen order.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    extract(&HASHTAG, text)
}

/// `@user` runs in `text`, lowercased, without the sigil, first-seen order.
pub fn extract_mentions(text: &str) -> Vec<String> {
    extract(&MENTION, text)
}

fn extract(pattern: &Regex, text: &str) -> Vec<String> {
    normalize_tokens(
        pattern
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str())),
    )
}

/// Lowercase, strip a leading `#`/`@`, drop blanks and duplicates.
///
/// Duplicates keep their first position so downstream rankings can break ties
/// by traversal order.
pub fn normalize_tokens<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in tokens {
        let token = raw
            .as_ref()
            .trim()
            .trim_start_matches(['#', '@'])
            .to_lowercase();
        if token.is_empty() {
            continue;
        }
        if seen.insert(token.clone()) {
            out.push(token);
        }
    }
    out
}

/// Split a delimited tag cell (`"#a, #b;c d"`) into normalized tokens.
pub fn split_token_list(cell: &str) -> Vec<String> {
    normalize_tokens(
        cell.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .map(|t| t.trim_matches(|c: char| matches!(c, '[' | ']' | '\'' | '"'))),
    )
}
