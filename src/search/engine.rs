use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;

use crate::indexer::tokenizer::Tokenizer;
use crate::store::{Posting, PostingStore, StoreError};

/// Share of query keywords a message must carry to count as a hit.
pub const DEFAULT_HIT_RATIO: f64 = 0.75;

/// Tokenize `keywords` the way queries are tokenized and return the
/// `skip`-th most recent matching posting (0 = most recent).
///
/// A query that is left with no keywords after stopword removal matches
/// nothing; callers are expected to reject it before getting here.
pub async fn search<S: PostingStore + ?Sized>(
    store: &S,
    chat_id: i64,
    keywords: &str,
    skip: u32,
    hit_ratio: f64,
) -> Result<Option<Posting>, StoreError> {
    let keywords = Tokenizer::new().query_keywords(keywords);
    find_match(store, chat_id, &keywords, skip, hit_ratio).await
}

/// Streaming k-way merge over one most-recent-first cursor per keyword.
///
/// Each round counts message ids among the current cursor heads. When the
/// most frequent one reaches `ceil(k * hit_ratio)` it is a match: either
/// returned, or consumed against `skip`. Then exactly one cursor advances,
/// the one whose head is the most recent, so the union of all lists is
/// visited in non-increasing timestamp order and never materialized.
pub async fn find_match<S: PostingStore + ?Sized>(
    store: &S,
    chat_id: i64,
    keywords: &[String],
    skip: u32,
    hit_ratio: f64,
) -> Result<Option<Posting>, StoreError> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let required = required_hits(keywords.len(), hit_ratio);

    let mut cursors = keywords
        .iter()
        .map(|keyword| store.open_cursor(chat_id, keyword))
        .collect::<Result<Vec<_>, _>>()?;

    // Only the first fetch runs concurrently; every later advance is sequential.
    let mut heads: Vec<Option<Posting>> =
        try_join_all(cursors.iter_mut().map(|cursor| cursor.next_posting())).await?;

    let mut remaining = skip;
    // With a ratio below 1 a message can stay above the threshold after one
    // of its postings is advanced past. Holds at most `skip + 1` ids.
    let mut matched: HashSet<i64> = HashSet::new();

    loop {
        if let Some((posting, hits)) = most_hit(&heads) {
            if hits >= required && matched.insert(posting.message_id) {
                if remaining == 0 {
                    return Ok(Some(posting));
                }
                remaining -= 1;
            }
        }

        let Some(latest) = most_recent_head(&heads) else {
            break;
        };
        heads[latest] = cursors[latest].next_posting().await?;
    }

    Ok(None)
}

/// `ceil(k * ratio)`, raised to a strict majority of `k` and capped at `k`.
///
/// Below a majority two different messages can meet the threshold in the same
/// round, and the older one could be reported ahead of the newer.
pub fn required_hits(keyword_count: usize, hit_ratio: f64) -> usize {
    let required = (keyword_count as f64 * hit_ratio).ceil() as usize;
    required
        .max(keyword_count / 2 + 1)
        .min(keyword_count.max(1))
}

/// The message id occurring most often among the live heads, with its count.
/// Ties go to whichever id reached the winning count first.
fn most_hit(heads: &[Option<Posting>]) -> Option<(Posting, usize)> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut best: Option<(Posting, usize)> = None;

    for posting in heads.iter().flatten() {
        let count = counts.entry(posting.message_id).or_insert(0);
        *count += 1;
        let leads = match &best {
            Some((_, best_count)) => *count > *best_count,
            None => true,
        };
        if leads {
            best = Some((*posting, *count));
        }
    }

    best
}

/// Index of the head with the strictly greatest timestamp; the earliest
/// cursor wins ties.
fn most_recent_head(heads: &[Option<Posting>]) -> Option<usize> {
    let mut latest: Option<(usize, i64)> = None;
    for (index, head) in heads.iter().enumerate() {
        let Some(posting) = head else {
            continue;
        };
        match latest {
            Some((_, timestamp)) if posting.timestamp <= timestamp => {}
            _ => latest = Some((index, posting.timestamp)),
        }
    }
    latest.map(|(index, _)| index)
}
