//! In-memory collaborators for unit tests.

use crate::clients::{
    DocumentStore, InlineButton, Messenger, NewsSource, SearchQuery, StoredDocument, VersionToken,
};
use crate::error::BotError;
use crate::models::Article;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn article(title: &str, url: &str, description: Option<&str>) -> Article {
    Article {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        url: Some(url.to_string()),
        published_at: Some("2025-09-01T00:00:00Z".to_string()),
    }
}

/// Returns a fixed batch and remembers the queries it saw.
#[derive(Default)]
pub struct FixedNews {
    pub articles: Vec<Article>,
    pub fail: bool,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl FixedNews {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            ..Self::default()
        }
    }
}

impl NewsSource for FixedNews {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Article>, BotError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(BotError::Timeout { service: "news" });
        }
        Ok(self.articles.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub buttons: Vec<InlineButton>,
}

/// Records messages; sends whose text contains `fail_on` fail.
#[derive(Default)]
pub struct RecordingMessenger {
    pub fail_on: Option<String>,
    pub fail_callbacks: bool,
    pub sent: Mutex<Vec<SentMessage>>,
    pub callbacks: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> Vec<(String, String)> {
        self.callbacks.lock().unwrap().clone()
    }
}

impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<(), BotError> {
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(BotError::status("telegram", 400, "Bad Request"));
            }
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), BotError> {
        if self.fail_callbacks {
            return Err(BotError::Timeout { service: "telegram" });
        }
        self.callbacks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    docs: HashMap<String, (String, u64)>,
    next_version: u64,
    writes: usize,
    fail_reads: bool,
    fail_next_read: HashSet<String>,
    fail_writes: bool,
    conflict_next_put: bool,
}

/// Versioned in-memory store with the same token rules as the real one.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn seed(&self, path: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_version += 1;
        let version = state.next_version;
        state.docs.insert(path.to_string(), (body.to_string(), version));
    }

    pub fn body(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .docs
            .get(path)
            .map(|(body, _)| body.clone())
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Fail only the next `get` of `path`.
    pub fn fail_next_read(&self, path: &str) {
        self.state.lock().unwrap().fail_next_read.insert(path.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Make the next `put` lose a race against another writer.
    pub fn conflict_next_put(&self) {
        self.state.lock().unwrap().conflict_next_put = true;
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, BotError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_read.remove(path) || state.fail_reads {
            return Err(BotError::Timeout { service: "github" });
        }
        Ok(state.docs.get(path).map(|(body, version)| StoredDocument {
            body: body.clone(),
            version: VersionToken(version.to_string()),
        }))
    }

    async fn put(
        &self,
        path: &str,
        body: &str,
        version: Option<&VersionToken>,
        _message: &str,
    ) -> Result<(), BotError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(BotError::status("github", 500, "Server Error"));
        }
        if state.conflict_next_put {
            state.conflict_next_put = false;
            return Err(BotError::VersionConflict {
                path: path.to_string(),
            });
        }

        let current = state.docs.get(path).map(|(_, v)| v.to_string());
        let supplied = version.map(|v| v.0.clone());
        if current != supplied {
            return Err(BotError::VersionConflict {
                path: path.to_string(),
            });
        }

        state.next_version += 1;
        let next = state.next_version;
        state.docs.insert(path.to_string(), (body.to_string(), next));
        state.writes += 1;
        Ok(())
    }
}
