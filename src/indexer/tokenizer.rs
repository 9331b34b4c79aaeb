use std::collections::HashSet;

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use unicode_segmentation::UnicodeSegmentation;

static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// High-frequency function words that would otherwise dominate the overlap
/// ratio of a query. Only applied to queries, never at index time.
const STOPWORDS: &str = "的一不是了我人在有这来它中大上个国说也子";

pub struct Tokenizer {
    jieba: &'static Jieba,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self { jieba: &JIEBA }
    }

    /// Keyword set of a message: the dictionary-only cut unioned with the
    /// HMM cut (which recovers words missing from the dictionary), normalized
    /// and deduplicated in first-seen order.
    pub fn keywords(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let dictionary = self.jieba.cut(text, false);
        let statistical = self.jieba.cut(text, true);

        for token in dictionary.into_iter().chain(statistical) {
            let Some(normalized) = normalize(token) else {
                continue;
            };
            if seen.insert(normalized.clone()) {
                result.push(normalized);
            }
        }

        result
    }

    /// Keyword set of a search query: the message keyword set minus stopwords.
    pub fn query_keywords(&self, query: &str) -> Vec<String> {
        self.keywords(query)
            .into_iter()
            .filter(|k| !is_stopword(k))
            .collect()
    }
}

fn normalize(token: &str) -> Option<String> {
    let trimmed = token.trim();
    // Whitespace and punctuation runs carry no word segment.
    if trimmed.unicode_words().next().is_none() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

fn is_stopword(keyword: &str) -> bool {
    let mut chars = keyword.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => STOPWORDS.contains(c),
        _ => false,
    }
}
