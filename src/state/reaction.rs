use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of reactions kept in memory
pub const REACTION_CAPACITY: usize = 500;

/// Stored reactions longer than this (in characters) are cut
pub const MAX_REACTION_CHARS: usize = 1000;

const TRUNCATION_MARKER: &str = "...";
const PREVIEW_CHARS: usize = 50;

/// A single saved reaction with request metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub id: String,
    pub reaction: String,
    pub timestamp: String,
    pub saved_at: String,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
}

/// Where a reaction came from
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            ip: "unknown".to_string(),
            user_agent: "unknown".to_string(),
            referer: "unknown".to_string(),
        }
    }
}

impl ReactionRecord {
    /// Build a record from already-validated text.
    ///
    /// `timestamp` is the client-supplied time; server capture time is used
    /// when it is absent.
    pub fn new(text: &str, timestamp: Option<String>, meta: RequestMeta) -> Self {
        let now = Utc::now();
        let saved_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        Self {
            id: generate_id(now.timestamp_millis()),
            reaction: truncate_reaction(text),
            timestamp: timestamp.unwrap_or_else(|| saved_at.clone()),
            saved_at,
            ip: meta.ip,
            user_agent: meta.user_agent,
            referer: meta.referer,
        }
    }

    /// Short form of the text for log lines
    pub fn preview(&self) -> String {
        truncate_chars(&self.reaction, PREVIEW_CHARS)
    }
}

/// Strip surrounding whitespace and U+FEFF
pub fn trim_reaction(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Cut text to `MAX_REACTION_CHARS` characters, appending a marker when cut
pub fn truncate_reaction(text: &str) -> String {
    truncate_chars(text, MAX_REACTION_CHARS)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Base-36 millisecond clock followed by 9 random base-36 characters
fn generate_id(millis: i64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut n = millis.max(0) as u64;
    let mut clock = Vec::new();
    loop {
        clock.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    clock.reverse();

    let mut rng = rand::thread_rng();
    let random = (0..9).map(|_| ALPHABET[rng.gen_range(0..36)] as char);

    clock.into_iter().map(char::from).chain(random).collect()
}

/// Insertion-ordered reaction list capped at a fixed capacity
#[derive(Debug)]
pub struct ReactionBuffer {
    records: VecDeque<ReactionRecord>,
    capacity: usize,
}

impl ReactionBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, dropping the oldest ones past capacity.
    /// Returns how many records were evicted.
    pub fn push(&mut self, record: ReactionRecord) -> usize {
        self.records.push_back(record);

        let mut evicted = 0;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn to_vec(&self) -> Vec<ReactionRecord> {
        self.records.iter().cloned().collect()
    }

    /// Empty the buffer, returning the number of records removed
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }
}

/// Shared handle to the process-local reaction buffer.
///
/// Append and trim happen under one lock, so the buffer never holds more
/// than its capacity once a call returns. The bound is per process only.
#[derive(Debug, Clone)]
pub struct ReactionStore {
    inner: Arc<Mutex<ReactionBuffer>>,
}

impl ReactionStore {
    pub fn new() -> Self {
        Self::with_capacity(REACTION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReactionBuffer::new(capacity))),
        }
    }

    pub fn insert(&self, record: ReactionRecord) {
        tracing::info!(
            id = %record.id,
            timestamp = %record.timestamp,
            length = record.reaction.chars().count(),
            ip = %record.ip,
            preview = %record.preview(),
            "new reaction saved"
        );

        let (evicted, len) = {
            let mut buffer = self.inner.lock();
            let evicted = buffer.push(record);
            (evicted, buffer.len())
        };

        if evicted > 0 {
            tracing::info!(evicted, "reactions trimmed to {} entries", len);
        }
    }

    /// Copy of all stored reactions, oldest first
    pub fn snapshot(&self) -> Vec<ReactionRecord> {
        self.inner.lock().to_vec()
    }

    /// Drop every stored reaction; returns how many were cleared
    pub fn reset(&self) -> usize {
        let cleared = self.inner.lock().clear();
        tracing::info!(cleared, "reactions cleared");
        cleared
    }
}

impl Default for ReactionStore {
    fn default() -> Self {
        Self::new()
    }
}
