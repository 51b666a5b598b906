//! Periodic sync and deduplication.
//!
//! A [`SyncService`] pass removes duplicate conversations (same user message,
//! case-insensitive and trimmed) and duplicate summaries (same content),
//! keeping the most recent copy of each. Every deleted record also takes its
//! generated graph nodes with it. The pass ends with the graph store's own
//! deduplication.
//!
//! Conversations and summaries live in external collaborators reached through
//! the [`ConversationStore`] and [`SummaryStore`] traits. Each sub-task is
//! fault-tolerant: a failing collaborator is logged and recorded in the
//! report, and the remaining sub-tasks still run.
//!
//! The service itself is synchronous. [`daemon::SyncDaemon`] (feature
//! `daemon`) drives it from a tokio loop.

#[cfg(feature = "daemon")]
pub mod daemon;
pub mod records;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::store::GraphStore;

pub use records::{JsonRecordStore, RecordFile};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("{operation} failed: {message}")]
    #[diagnostic(
        code(neurovault::sync::collaborator),
        help("The conversation or summary store did not respond as expected. The next pass retries.")
    )]
    Collaborator { operation: String, message: String },

    #[error("record file {path}: {message}")]
    #[diagnostic(
        code(neurovault::sync::records),
        help("Check that the record file is valid JSON with `conversations` and `summaries` arrays.")
    )]
    Records { path: String, message: String },

    #[error("record not found: \"{id}\"")]
    #[diagnostic(code(neurovault::sync::not_found), help("List records to find valid ids."))]
    NotFound { id: String },
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

// ── Records and collaborators ───────────────────────────────────────────

/// A stored chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub user_message: String,
    #[serde(default)]
    pub ai_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    /// A record stamped with the current time.
    pub fn new(id: &str, user_message: &str, ai_response: &str) -> Self {
        Self {
            conversation_id: id.to_string(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            topic: None,
            user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A stored summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub content: String,
    pub created: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(id: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            content: content.to_string(),
            created: Utc::now(),
        }
    }

    pub fn at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }
}

/// External conversation storage.
pub trait ConversationStore: Send + Sync {
    fn list_conversations(&self) -> SyncResult<Vec<ConversationRecord>>;
    fn delete_conversation(&self, conversation_id: &str) -> SyncResult<()>;
}

/// External summary storage.
pub trait SummaryStore: Send + Sync {
    fn list_summaries(&self) -> SyncResult<Vec<SummaryRecord>>;
    fn delete_summary(&self, summary_id: &str) -> SyncResult<()>;
}

/// Items that lose to a more recent copy with the same normalized key.
///
/// Keys are compared trimmed and lower-cased. Within a group the newest item
/// is kept; equal timestamps keep the earlier-listed item.
pub fn stale_duplicates<'a, T>(
    items: &'a [T],
    key: impl Fn(&T) -> &str,
    time: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<&'a T> {
    let mut groups: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        groups
            .entry(key(item).trim().to_lowercase())
            .or_default()
            .push(item);
    }

    let mut stale = Vec::new();
    for mut group in groups.into_values() {
        group.sort_by(|a, b| time(b).cmp(&time(a)));
        stale.extend(group.into_iter().skip(1));
    }
    stale
}

// ── Service ─────────────────────────────────────────────────────────────

/// Scheduling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Minimum time between passes (default: 30 min).
    pub interval: Duration,
    /// Sleep between eligibility checks (default: 60s).
    pub check_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            check_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub conversations_removed: usize,
    pub summaries_removed: usize,
    /// Generated nodes and edges removed alongside deleted records.
    pub graph_nodes_removed: usize,
    pub graph_edges_removed: usize,
    /// Duplicate ids removed by the graph store's own pass.
    pub graph_duplicates_removed: usize,
    pub total_items_cleaned: usize,
    pub failures: Vec<String>,
    pub sync_time: DateTime<Utc>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            conversations_removed: 0,
            summaries_removed: 0,
            graph_nodes_removed: 0,
            graph_edges_removed: 0,
            graph_duplicates_removed: 0,
            total_items_cleaned: 0,
            failures: Vec::new(),
            sync_time: Utc::now(),
        }
    }
}

/// Deduplicates conversations, summaries and graph data.
pub struct SyncService {
    conversations: Arc<dyn ConversationStore>,
    summaries: Arc<dyn SummaryStore>,
    graph: Arc<GraphStore>,
    config: SyncConfig,
    state: SyncState,
    last_sync: Option<Instant>,
    last_report: Option<SyncReport>,
    passes: usize,
}

impl SyncService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        summaries: Arc<dyn SummaryStore>,
        graph: Arc<GraphStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            conversations,
            summaries,
            graph,
            config,
            state: SyncState::Idle,
            last_sync: None,
            last_report: None,
            passes: 0,
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    /// Number of completed passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Whether a pass should run at `now`: never ran, or the interval elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.interval,
        }
    }

    /// Run a pass if one is due.
    pub fn tick(&mut self, now: Instant) -> Option<SyncReport> {
        if self.state == SyncState::Running || !self.is_due(now) {
            return None;
        }
        Some(self.run_pass_at(now))
    }

    /// Run a pass now regardless of the schedule.
    pub fn run_pass(&mut self) -> SyncReport {
        self.run_pass_at(Instant::now())
    }

    fn run_pass_at(&mut self, now: Instant) -> SyncReport {
        self.state = SyncState::Running;
        let mut report = SyncReport::new();

        if let Err(e) = self.sync_conversations(&mut report) {
            tracing::warn!(error = %e, "conversation sync failed");
            report.failures.push(format!("conversations: {e}"));
        }
        if let Err(e) = self.sync_summaries(&mut report) {
            tracing::warn!(error = %e, "summary sync failed");
            report.failures.push(format!("summaries: {e}"));
        }
        self.sync_graph(&mut report);

        report.total_items_cleaned = report.conversations_removed
            + report.summaries_removed
            + report.graph_nodes_removed
            + report.graph_edges_removed
            + report.graph_duplicates_removed;

        tracing::info!(
            conversations = report.conversations_removed,
            summaries = report.summaries_removed,
            total = report.total_items_cleaned,
            failures = report.failures.len(),
            "sync pass complete"
        );

        self.last_sync = Some(now);
        self.last_report = Some(report.clone());
        self.passes += 1;
        self.state = SyncState::Idle;
        report
    }

    fn sync_conversations(&self, report: &mut SyncReport) -> SyncResult<()> {
        let conversations = self.conversations.list_conversations()?;
        for stale in stale_duplicates(&conversations, |c| &c.user_message, |c| c.timestamp) {
            let id = &stale.conversation_id;
            if let Err(e) = self.conversations.delete_conversation(id) {
                tracing::warn!(conversation_id = %id, error = %e, "could not delete duplicate conversation");
                report.failures.push(format!("conversation {id}: {e}"));
                continue;
            }
            report.conversations_removed += 1;
            let removed = self.graph.remove_nodes_with_property("conversation_id", id);
            report.graph_nodes_removed += removed.nodes_removed;
            report.graph_edges_removed += removed.edges_removed;
            if let Some(warning) = removed.persist_warning {
                report.failures.push(format!("graph: {warning}"));
            }
        }
        Ok(())
    }

    fn sync_summaries(&self, report: &mut SyncReport) -> SyncResult<()> {
        let summaries = self.summaries.list_summaries()?;
        for stale in stale_duplicates(&summaries, |s| &s.content, |s| s.created) {
            let id = &stale.id;
            if let Err(e) = self.summaries.delete_summary(id) {
                tracing::warn!(summary_id = %id, error = %e, "could not delete duplicate summary");
                report.failures.push(format!("summary {id}: {e}"));
                continue;
            }
            report.summaries_removed += 1;
            let removed = self.graph.remove_nodes_with_property("summary_id", id);
            report.graph_nodes_removed += removed.nodes_removed;
            report.graph_edges_removed += removed.edges_removed;
            if let Some(warning) = removed.persist_warning {
                report.failures.push(format!("graph: {warning}"));
            }
        }
        Ok(())
    }

    fn sync_graph(&self, report: &mut SyncReport) {
        let dedup = self.graph.deduplicate();
        report.graph_duplicates_removed = dedup.nodes_removed + dedup.edges_removed;
        if let Some(warning) = dedup.persist_warning {
            report.failures.push(format!("graph: {warning}"));
        }
    }
}
