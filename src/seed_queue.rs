use crate::api_client::{RecordKind, StoreRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SeedStatus {
    Queued,
    Fetching,
    Completed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedItem {
    pub id: Uuid,
    /// `None` for names that were requested but have no record in the store.
    pub record_id: Option<u64>,
    pub kind: RecordKind,
    pub name: String,
    pub status: SeedStatus,
    pub added_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SeedItem {
    pub fn new(kind: RecordKind, record_id: Option<u64>, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            kind,
            name,
            status: SeedStatus::Queued,
            added_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start_fetch(&mut self) {
        self.status = SeedStatus::Fetching;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = SeedStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn skip(&mut self, reason: String) {
        self.status = SeedStatus::Skipped(reason);
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SeedStatus::Failed(error);
        self.completed_at = Some(Utc::now());
    }
}

/// Bookkeeping for one seeding run.
pub struct SeedQueue {
    items: VecDeque<SeedItem>,
}

impl SeedQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn add_record(&mut self, record: &StoreRecord) -> Uuid {
        let item = SeedItem::new(record.kind, Some(record.id), record.display_name().to_string());
        let id = item.id;
        self.items.push_back(item);
        id
    }

    /// Records a requested name the store does not know about as failed.
    pub fn add_missing(&mut self, kind: RecordKind, name: &str) -> Uuid {
        let mut item = SeedItem::new(kind, None, name.to_string());
        item.fail(format!("{} {} not found", kind, name));
        let id = item.id;
        self.items.push_back(item);
        id
    }

    pub fn get_item_by_id(&self, id: Uuid) -> Option<&SeedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_item_mut_by_id(&mut self, id: Uuid) -> Option<&mut SeedItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn count(&self, predicate: impl Fn(&SeedStatus) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(&item.status)).count()
    }

    pub fn get_stats(&self) -> QueueStats {
        QueueStats {
            total: self.items.len(),
            queued: self.count(|status| matches!(status, SeedStatus::Queued)),
            active: self.count(|status| matches!(status, SeedStatus::Fetching)),
            completed: self.count(|status| matches!(status, SeedStatus::Completed)),
            skipped: self.count(|status| matches!(status, SeedStatus::Skipped(_))),
            failed: self.count(|status| matches!(status, SeedStatus::Failed(_))),
        }
    }
}

impl Default for SeedQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}
