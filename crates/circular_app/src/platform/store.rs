//! Local record store for topics and messages, kept as one RON file in the
//! data directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use circular_core::{Message, Role, Topic};
use circular_logging::{chat_info, chat_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const STORE_FILENAME: &str = "circular_chat_store.ron";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data directory missing or not writable: {0}")]
    DataDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("could not serialize records: {0}")]
    Serialize(#[from] ron::Error),
    #[error("unknown topic {0}")]
    UnknownTopic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum StoredRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTopic {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    id: String,
    topic_id: String,
    content: String,
    role: StoredRole,
    #[serde(default)]
    sources: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Records {
    topics: Vec<StoredTopic>,
    messages: Vec<StoredMessage>,
}

pub struct LocalStore {
    dir: PathBuf,
    records: Records,
}

impl LocalStore {
    /// Opens the store in `dir`, creating the directory when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_data_dir(&dir)?;

        let path = dir.join(STORE_FILENAME);
        let records = match fs::read_to_string(&path) {
            Ok(text) => ron::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Records::default(),
            Err(err) => return Err(err.into()),
        };
        chat_info!(
            "Opened record store {:?} topics={} messages={}",
            path,
            records.topics.len(),
            records.messages.len()
        );
        Ok(Self { dir, records })
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.records.topics.iter().map(to_topic).collect()
    }

    pub fn messages(&self, topic_id: &str) -> Vec<Message> {
        self.records
            .messages
            .iter()
            .filter(|message| message.topic_id == topic_id)
            .map(to_message)
            .collect()
    }

    pub fn upsert_topic(&mut self, topic: &Topic) -> Result<(), StoreError> {
        let mut next = self.records.clone();
        let stored = from_topic(topic);
        match next.topics.iter_mut().find(|existing| existing.id == topic.id) {
            Some(existing) => *existing = stored,
            None => next.topics.push(stored),
        }
        self.commit(next)
    }

    /// Stores a message. Its topic must already be stored.
    pub fn insert_message(&mut self, message: &Message) -> Result<(), StoreError> {
        if !self
            .records
            .topics
            .iter()
            .any(|topic| topic.id == message.topic_id)
        {
            chat_warn!("Rejecting message {} for unknown topic {}", message.id, message.topic_id);
            return Err(StoreError::UnknownTopic(message.topic_id.clone()));
        }
        let mut next = self.records.clone();
        let stored = from_message(message);
        match next.messages.iter_mut().find(|existing| existing.id == message.id) {
            Some(existing) => *existing = stored,
            None => next.messages.push(stored),
        }
        self.commit(next)
    }

    fn commit(&mut self, next: Records) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&next, pretty)?;
        write_atomic(&self.dir, STORE_FILENAME, &content)?;
        self.records = next;
        Ok(())
    }
}

fn ensure_data_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::DataDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file in the same directory.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<(), StoreError> {
    ensure_data_dir(dir)?;
    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn to_topic(stored: &StoredTopic) -> Topic {
    Topic {
        id: stored.id.clone(),
        title: stored.title.clone(),
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

fn from_topic(topic: &Topic) -> StoredTopic {
    StoredTopic {
        id: topic.id.clone(),
        title: topic.title.clone(),
        created_at: topic.created_at,
        updated_at: topic.updated_at,
    }
}

fn to_message(stored: &StoredMessage) -> Message {
    Message {
        id: stored.id.clone(),
        topic_id: stored.topic_id.clone(),
        content: stored.content.clone(),
        role: match stored.role {
            StoredRole::User => Role::User,
            StoredRole::Assistant => Role::Assistant,
        },
        sources: stored.sources.clone(),
        created_at: stored.created_at,
    }
}

fn from_message(message: &Message) -> StoredMessage {
    StoredMessage {
        id: message.id.clone(),
        topic_id: message.topic_id.clone(),
        content: message.content.clone(),
        role: match message.role {
            Role::User => StoredRole::User,
            Role::Assistant => StoredRole::Assistant,
        },
        sources: message.sources.clone(),
        created_at: message.created_at,
    }
}
