use pulse_types::SentimentRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default ranking length used by the dashboard.
pub const TOP_K: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenField {
    Hashtags,
    Mentions,
}

impl TokenField {
    pub fn tokens(self, record: &SentimentRecord) -> &[String] {
        match self {
            Self::Hashtags => &record.hashtags,
            Self::Mentions => &record.mentions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub token: String,
    pub count: u64,
}

pub type TokenRanking = Vec<TokenCount>;

/// The `k` most frequent hashtags or mentions across `records`.
pub fn top_tokens(records: &[SentimentRecord], field: TokenField, k: usize) -> TokenRanking {
    rank(
        records.iter().flat_map(|r| field.tokens(r).iter()),
        k,
    )
}

/// Count tokens longer than one character and keep the `k` most frequent.
///
/// Counts descend; equal counts keep the order their token was first seen in.
pub(crate) fn rank<I, S>(tokens: I, k: usize) -> TokenRanking
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: TokenRanking = Vec::new();

    for token in tokens {
        let token = token.as_ref();
        if token.chars().count() <= 1 {
            continue;
        }
        match index.get(token) {
            Some(&slot) => counts[slot].count += 1,
            None => {
                index.insert(token.to_string(), counts.len());
                counts.push(TokenCount {
                    token: token.to_string(),
                    count: 1,
                });
            }
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(k);
    counts
}
