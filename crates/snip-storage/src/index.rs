use snip_core::{Token, UrlRecord};
use std::collections::HashMap;

/// The in-memory maps shared by the memory and file engines.
///
/// - `records`: token -> record
/// - `by_url`: original URL -> most recently written token
/// - `live_by_url`: original URL -> token, for non-deleted records only
///
/// No locking happens here; the owning engine decides the policy.
#[derive(Debug, Default)]
pub struct BaseIndex {
    records: HashMap<Token, UrlRecord>,
    by_url: HashMap<String, Token>,
    live_by_url: HashMap<String, Token>,
}

impl BaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &Token) -> Option<&UrlRecord> {
        self.records.get(token)
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.records.contains_key(token)
    }

    /// Stores `record` under its token and refreshes both URL maps.
    pub fn set(&mut self, record: UrlRecord) {
        // An overwrite under the same token must not leave the old URL
        // pointing at this token in the live map.
        if let Some(previous) = self.records.get(&record.token) {
            if previous.original_url != record.original_url
                && self.live_by_url.get(&previous.original_url) == Some(&record.token)
            {
                self.live_by_url.remove(&previous.original_url);
            }
        }

        self.by_url
            .insert(record.original_url.clone(), record.token.clone());

        if record.is_live() {
            self.live_by_url
                .insert(record.original_url.clone(), record.token.clone());
        } else if self.live_by_url.get(&record.original_url) == Some(&record.token) {
            self.live_by_url.remove(&record.original_url);
        }

        self.records.insert(record.token.clone(), record);
    }

    /// Reverse lookup; tombstoned records keep their mapping.
    pub fn token_by_url(&self, original_url: &str) -> Option<&Token> {
        self.by_url.get(original_url)
    }

    /// Reverse lookup restricted to live records.
    pub fn live_token_by_url(&self, original_url: &str) -> Option<&Token> {
        self.live_by_url.get(original_url)
    }

    pub fn records(&self) -> impl Iterator<Item = &UrlRecord> {
        self.records.values()
    }

    /// Every record, ordered so that replaying them through [`BaseIndex::set`]
    /// rebuilds both URL maps exactly as they are now.
    ///
    /// `set` lets the last write for a URL win, so the current reverse-map
    /// target goes last and the current live target just before it.
    pub fn replay_order(&self) -> Vec<&UrlRecord> {
        let rank = |record: &UrlRecord| {
            let url = record.original_url.as_str();
            if self.by_url.get(url) == Some(&record.token) {
                2
            } else if self.live_by_url.get(url) == Some(&record.token) {
                1
            } else {
                0
            }
        };

        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| {
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.token.cmp(&b.token))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
