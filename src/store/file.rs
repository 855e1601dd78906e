//! JSON file-backed document store.
//!
//! One file per collection under a data directory. Collections are held in
//! memory behind one lock and flushed on every mutation with a
//! write-temp-then-rename so a crash mid-write never leaves a torn file.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::traits::{DocumentStore, NotificationStore, RecordStore, StoreError};
use crate::workflow::status::{DocumentStatus, RequestStatus};
use crate::workflow::types::{
    ApplicationRecord, ApprovalHistoryEntry, MedicalDocument, Notification,
};

const RECORDS_FILE: &str = "records.json";
const HISTORY_FILE: &str = "history.json";
const NOTIFICATIONS_FILE: &str = "notifications.json";
const DOCUMENTS_FILE: &str = "documents.json";

#[derive(Default)]
struct Collections {
    records: HashMap<String, ApplicationRecord>,
    history: Vec<ApprovalHistoryEntry>,
    notifications: Vec<Notification>,
    documents: HashMap<String, MedicalDocument>,
}

pub struct FileStore {
    data_dir: PathBuf,
    state: RwLock<Collections>,
}

impl FileStore {
    /// Open (or create) a store rooted at `data_dir`, loading any existing
    /// collection files.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await?;

        let state = Collections {
            records: load_or_default(&data_dir.join(RECORDS_FILE)).await?,
            history: load_or_default(&data_dir.join(HISTORY_FILE)).await?,
            notifications: load_or_default(&data_dir.join(NOTIFICATIONS_FILE)).await?,
            documents: load_or_default(&data_dir.join(DOCUMENTS_FILE)).await?,
        };

        info!(
            data_dir = %data_dir.display(),
            records = state.records.len(),
            history = state.history.len(),
            "File store opened"
        );

        Ok(Self {
            data_dir,
            state: RwLock::new(state),
        })
    }

    async fn flush_records(&self, collections: &Collections) -> Result<(), StoreError> {
        write_atomic(&self.data_dir.join(RECORDS_FILE), &collections.records).await
    }

    async fn flush_history(&self, collections: &Collections) -> Result<(), StoreError> {
        write_atomic(&self.data_dir.join(HISTORY_FILE), &collections.history).await
    }

    async fn flush_notifications(&self, collections: &Collections) -> Result<(), StoreError> {
        write_atomic(
            &self.data_dir.join(NOTIFICATIONS_FILE),
            &collections.notifications,
        )
        .await
    }

    async fn flush_documents(&self, collections: &Collections) -> Result<(), StoreError> {
        write_atomic(&self.data_dir.join(DOCUMENTS_FILE), &collections.documents).await
    }
}

async fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(file = %path.display(), "Collection file not present, starting empty");
            Ok(T::default())
        }
        Err(err) => Err(err.into()),
    }
}

/// Write to a temporary file first, then rename (atomic on the same
/// filesystem).
async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let serialized = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, serialized).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileStore {
    async fn get_record(&self, id: &str) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn insert_record(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.records.insert(record.id.clone(), record.clone());
        self.flush_records(&state).await?;
        info!(record_id = %record.id, status = %record.request_status, "Record inserted");
        Ok(())
    }

    async fn commit_transition(
        &self,
        record: &ApplicationRecord,
        expected_status: RequestStatus,
        entry: &ApprovalHistoryEntry,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
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

        state.records.insert(record.id.clone(), record.clone());
        state.history.push(entry.clone());
        self.flush_records(&state).await?;
        self.flush_history(&state).await?;
        Ok(())
    }

    async fn records_with_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self
            .state
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
            .state
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
impl NotificationStore for FileStore {
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.notifications.push(notification.clone());
        self.flush_notifications(&state).await
    }

    async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|notification| notification.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        notification.read = true;
        self.flush_notifications(&state).await
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get_document(&self, id: &str) -> Result<Option<MedicalDocument>, StoreError> {
        Ok(self.state.read().await.documents.get(id).cloned())
    }

    async fn insert_document(&self, document: &MedicalDocument) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.documents.insert(document.id.clone(), document.clone());
        self.flush_documents(&state).await
    }

    async fn finalize_document(
        &self,
        document: &MedicalDocument,
        expected_status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .documents
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
        state.documents.insert(document.id.clone(), document.clone());
        self.flush_documents(&state).await
    }
}
