//! Word frequencies for the word-cloud panel.

use crate::ranking::{rank, TokenRanking};
use once_cell::sync::Lazy;
use pulse_types::SentimentRecord;
use regex::Regex;
use std::collections::HashSet;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]{3,}").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "all", "also", "and", "any", "are",
        "aren", "because", "been", "before", "being", "below", "between", "both", "but",
        "can", "cannot", "could", "couldn", "did", "didn", "does", "doesn", "doing", "don",
        "down", "during", "each", "else", "ever", "few", "for", "from", "further", "get",
        "had", "hadn", "has", "hasn", "have", "haven", "having", "her", "here", "hers",
        "herself", "him", "himself", "his", "how", "however", "http", "https", "into",
        "isn", "its", "itself", "just", "let", "like", "more", "most", "mustn", "myself",
        "nor", "not", "now", "off", "once", "only", "other", "otherwise", "ought", "our",
        "ours", "ourselves", "out", "over", "own", "same", "shall", "shan", "she",
        "should", "shouldn", "since", "some", "such", "than", "that", "the", "their",
        "theirs", "them", "themselves", "then", "there", "therefore", "these", "they",
        "this", "those", "through", "too", "under", "until", "very", "was", "wasn", "were",
        "weren", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
        "with", "won", "would", "wouldn", "www", "you", "your", "yours", "yourself",
        "yourselves", "com", "amp", "via",
    ]
    .into_iter()
    .collect()
});

/// The `k` most frequent content words across the records' text.
///
/// Words are lowercased runs of at least three ASCII letters or digits. URLs,
/// hashtags, mentions, stopwords and bare numbers are left out.
pub fn word_frequencies(records: &[SentimentRecord], k: usize) -> TokenRanking {
    rank(records.iter().flat_map(|r| content_words(&r.text)), k)
}

fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .filter(|chunk| !is_skipped_chunk(chunk))
        .flat_map(|chunk| WORD.find_iter(chunk).map(|m| m.as_str().to_lowercase()))
        .filter(|word| !STOPWORDS.contains(word.as_str()))
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
}

fn is_skipped_chunk(chunk: &str) -> bool {
    let lower = chunk.to_ascii_lowercase();
    chunk.starts_with(['#', '@'])
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("www.")
}
