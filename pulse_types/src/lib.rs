pub mod record;
pub mod tokens;

pub use record::{RawRecord, RecordError, Sentiment, SentimentRecord};
