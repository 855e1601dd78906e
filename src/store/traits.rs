// Trait seams for the persistence collaborator - the workflow engine only
// ever talks to these, so tests and embedders can swap the backing store.

use async_trait::async_trait;
use thiserror::Error;

use crate::workflow::status::{DocumentStatus, RequestStatus};
use crate::workflow::types::{
    ApplicationRecord, ApprovalHistoryEntry, MedicalDocument, Notification,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {id}")]
    NotFound { id: String },
    #[error("conditional write failed: expected status {expected}, found {actual}")]
    Conflict { expected: String, actual: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Application records and their append-only approval history.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, id: &str) -> Result<Option<ApplicationRecord>, StoreError>;

    async fn insert_record(&self, record: &ApplicationRecord) -> Result<(), StoreError>;

    /// Persist the updated record and append its history entry as one unit,
    /// conditional on the stored record still being at `expected_status`.
    /// A concurrent transition surfaces as `StoreError::Conflict` instead of
    /// a silent last-write-wins.
    async fn commit_transition(
        &self,
        record: &ApplicationRecord,
        expected_status: RequestStatus,
        entry: &ApprovalHistoryEntry,
    ) -> Result<(), StoreError>;

    async fn records_with_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ApplicationRecord>, StoreError>;

    /// Approval history for a record, in creation order.
    async fn history_for(&self, record_id: &str) -> Result<Vec<ApprovalHistoryEntry>, StoreError>;
}

/// Append-only notification log, one mutable `read` bit per entry.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    async fn mark_read(&self, id: &str) -> Result<(), StoreError>;
}

/// Medical documents: inserted by the upload flow, finalized exactly once.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, id: &str) -> Result<Option<MedicalDocument>, StoreError>;

    async fn insert_document(&self, document: &MedicalDocument) -> Result<(), StoreError>;

    /// The single allowed mutation of a document, conditional on its stored
    /// status still being `expected_status`.
    async fn finalize_document(
        &self,
        document: &MedicalDocument,
        expected_status: DocumentStatus,
    ) -> Result<(), StoreError>;
}
