//! JSON-file conversation and summary store.
//!
//! Holds `{ "conversations": [...], "summaries": [...] }` in memory behind a
//! mutex and rewrites the whole file atomically after each mutation. Used by
//! the CLI and as the in-memory collaborator in tests.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::{ConversationRecord, ConversationStore, SummaryRecord, SummaryStore, SyncError, SyncResult};
use crate::graph::snapshot::write_json_atomic;

/// On-disk layout of the record file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFile {
    #[serde(default)]
    pub conversations: Vec<ConversationRecord>,
    #[serde(default)]
    pub summaries: Vec<SummaryRecord>,
}

pub struct JsonRecordStore {
    path: Option<PathBuf>,
    data: Mutex<RecordFile>,
}

impl JsonRecordStore {
    /// Open a record file. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| SyncError::Records {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordFile::default(),
            Err(e) => {
                return Err(SyncError::Records {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(records: RecordFile) -> Self {
        Self {
            path: None,
            data: Mutex::new(records),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn conversations(&self) -> Vec<ConversationRecord> {
        self.lock().conversations.clone()
    }

    pub fn summaries(&self) -> Vec<SummaryRecord> {
        self.lock().summaries.clone()
    }

    /// Append a conversation, replacing any record with the same id.
    pub fn add_conversation(&self, record: ConversationRecord) -> SyncResult<()> {
        let mut data = self.lock();
        data.conversations
            .retain(|c| c.conversation_id != record.conversation_id);
        data.conversations.push(record);
        self.persist(&data)
    }

    /// Append a summary, replacing any record with the same id.
    pub fn add_summary(&self, record: SummaryRecord) -> SyncResult<()> {
        let mut data = self.lock();
        data.summaries.retain(|s| s.id != record.id);
        data.summaries.push(record);
        self.persist(&data)
    }

    fn lock(&self) -> MutexGuard<'_, RecordFile> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, data: &RecordFile) -> SyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_json_atomic(path, data).map_err(|e| SyncError::Records {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl ConversationStore for JsonRecordStore {
    fn list_conversations(&self) -> SyncResult<Vec<ConversationRecord>> {
        Ok(self.conversations())
    }

    fn delete_conversation(&self, conversation_id: &str) -> SyncResult<()> {
        let mut data = self.lock();
        let before = data.conversations.len();
        data.conversations
            .retain(|c| c.conversation_id != conversation_id);
        if data.conversations.len() == before {
            return Err(SyncError::NotFound {
                id: conversation_id.to_string(),
            });
        }
        self.persist(&data)
    }
}

impl SummaryStore for JsonRecordStore {
    fn list_summaries(&self) -> SyncResult<Vec<SummaryRecord>> {
        Ok(self.summaries())
    }

    fn delete_summary(&self, summary_id: &str) -> SyncResult<()> {
        let mut data = self.lock();
        let before = data.summaries.len();
        data.summaries.retain(|s| s.id != summary_id);
        if data.summaries.len() == before {
            return Err(SyncError::NotFound {
                id: summary_id.to_string(),
            });
        }
        self.persist(&data)
    }
}

impl std::fmt::Debug for JsonRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.lock();
        f.debug_struct("JsonRecordStore")
            .field("path", &self.path)
            .field("conversations", &data.conversations.len())
            .field("summaries", &data.summaries.len())
            .finish()
    }
}
