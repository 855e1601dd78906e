// In-memory store for tests and embedding - no side effects.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::traits::{DocumentStore, NotificationStore, RecordStore, StoreError};
use crate::workflow::status::{DocumentStatus, RequestStatus};
use crate::workflow::types::{
    ApplicationRecord, ApprovalHistoryEntry, MedicalDocument, Notification,
};

/// All four collections behind async locks. The record map and the history
/// log share one lock so `commit_transition` is genuinely atomic.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<RecordCollections>,
    notifications: RwLock<Vec<Notification>>,
    documents: RwLock<HashMap<String, MedicalDocument>>,
    fail_notifications: AtomicBool,
}

#[derive(Default)]
struct RecordCollections {
    records: HashMap<String, ApplicationRecord>,
    history: Vec<ApprovalHistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: make notification appends fail, to exercise the best-effort
    /// side-channel policy.
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    pub async fn notification_count(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn history_len(&self) -> usize {
        self.records.read().await.history.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, id: &str) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.records.read().await.records.get(id).cloned())
    }

    async fn insert_record(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .records
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        record: &ApplicationRecord,
        expected_status: RequestStatus,
        entry: &ApprovalHistoryEntry,
    ) -> Result<(), StoreError> {
        let mut collections = self.records.write().await;
        let stored = collections
            .records
            .get(&record.id)
            .ok_or_else(|| StoreError::NotFound {
                id: record.id.clone(),
            })?;
        if stored.request_status != expected_status {
            return Err(StoreError::Conflict {
                expected: expected_status.to_string(),
                actual: stored.request_status.to_string(),
            });
        }
        collections.records.insert(record.id.clone(), record.clone());
        collections.history.push(entry.clone());
        Ok(())
    }

    async fn records_with_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .records
            .values()
            .filter(|record| record.request_status == status)
            .cloned()
            .collect())
    }

    async fn history_for(&self, record_id: &str) -> Result<Vec<ApprovalHistoryEntry>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .history
            .iter()
            .filter(|entry| entry.record_id == record_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "notification store failure injected".to_string(),
            });
        }
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|notification| notification.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        notification.read = true;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, id: &str) -> Result<Option<MedicalDocument>, StoreError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn insert_document(&self, document: &MedicalDocument) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn finalize_document(
        &self,
        document: &MedicalDocument,
        expected_status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let stored = documents
            .get(&document.id)
            .ok_or_else(|| StoreError::NotFound {
                id: document.id.clone(),
            })?;
        if stored.status != expected_status {
            return Err(StoreError::Conflict {
                expected: expected_status.to_string(),
                actual: stored.status.to_string(),
            });
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_entry(record_id: &str, from: RequestStatus, to: RequestStatus) -> ApprovalHistoryEntry {
        ApprovalHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            previous_status: from,
            new_status: to,
            actor_id: Some("doc-1".to_string()),
            actor_role: Some(crate::workflow::status::Role::Doctor),
            reason: None,
            is_override: false,
            is_final_decision: false,
            auto_transitioned: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_transition_is_conditional_on_expected_status() {
        let store = MemoryStore::new();
        let mut record = ApplicationRecord::new_donor("rec-1", "user-1", "Donor");
        store.insert_record(&record).await.unwrap();

        record.set_status(RequestStatus::DoctorApproved, Utc::now());
        let entry = sample_entry("rec-1", RequestStatus::Pending, RequestStatus::DoctorApproved);
        store
            .commit_transition(&record, RequestStatus::Pending, &entry)
            .await
            .unwrap();

        // A second commit against the stale expected status conflicts.
        let stale = sample_entry("rec-1", RequestStatus::Pending, RequestStatus::Rejected);
        let err = store
            .commit_transition(&record, RequestStatus::Pending, &stale)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.history_len().await, 1);
    }

    #[tokio::test]
    async fn mark_read_flips_the_only_mutable_field() {
        let store = MemoryStore::new();
        let notification = Notification {
            id: "n-1".to_string(),
            user_id: "user-1".to_string(),
            title: "Status Update".to_string(),
            message: "msg".to_string(),
            read: false,
            kind: "status-update".to_string(),
            subtype: "pending".to_string(),
            record_id: None,
            document_id: None,
            created_at: Utc::now(),
        };
        store.append_notification(&notification).await.unwrap();
        store.mark_read("n-1").await.unwrap();
        let stored = store.notifications_for("user-1").await.unwrap();
        assert!(stored[0].read);
    }
}
