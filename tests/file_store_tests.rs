// File-backed store behavior: durability across reopen and conditional
// commits.

use std::path::PathBuf;
use std::sync::Arc;

use donorflow::store::{DocumentStore, FileStore, NotificationStore, RecordStore, StoreError};
use donorflow::workflow::{
    Action, Actor, ApplicationRecord, DocumentDecision, DocumentStatus, MedicalDocument,
    RecordMutator, RequestStatus, Role,
};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!(
            "donorflow-test-{}",
            donorflow::generate_correlation_id()
        ));
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[tokio::test]
async fn records_and_history_survive_a_reopen() {
    let dir = TempDir::new();

    {
        let store = Arc::new(FileStore::open(dir.0.clone()).await.unwrap());
        let mutator = RecordMutator::new(store.clone(), store.clone(), store.clone());

        let record = ApplicationRecord::new_donor("rec-1", "donor-1", "Test Donor");
        store.insert_record(&record).await.unwrap();
        mutator
            .apply("rec-1", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
            .await
            .unwrap();
    }

    let reopened = FileStore::open(dir.0.clone()).await.unwrap();
    let record = reopened.get_record("rec-1").await.unwrap().unwrap();
    assert_eq!(record.request_status, RequestStatus::DoctorApproved);
    assert_eq!(record.status, RequestStatus::DoctorApproved);

    let history = reopened.history_for("rec-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_status, RequestStatus::Pending);

    let inbox = reopened.notifications_for("donor-1").await.unwrap();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn conditional_commit_rejects_stale_snapshots() {
    let dir = TempDir::new();
    let store = FileStore::open(dir.0.clone()).await.unwrap();

    let mut record = ApplicationRecord::new_donor("rec-1", "donor-1", "Test Donor");
    store.insert_record(&record).await.unwrap();

    let now = record.created_at;
    record.set_status(RequestStatus::DoctorApproved, now);
    let entry = donorflow::ApprovalHistoryEntry {
        id: "e-1".to_string(),
        record_id: "rec-1".to_string(),
        previous_status: RequestStatus::Pending,
        new_status: RequestStatus::DoctorApproved,
        actor_id: Some("doc-1".to_string()),
        actor_role: Some(Role::Doctor),
        reason: None,
        is_override: false,
        is_final_decision: false,
        auto_transitioned: false,
        created_at: now,
    };
    store
        .commit_transition(&record, RequestStatus::Pending, &entry)
        .await
        .unwrap();

    let err = store
        .commit_transition(&record, RequestStatus::Pending, &entry)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(store.history_for("rec-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn document_review_persists_across_reopen() {
    let dir = TempDir::new();
    let document_id;

    {
        let store = Arc::new(FileStore::open(dir.0.clone()).await.unwrap());
        let mutator = RecordMutator::new(store.clone(), store.clone(), store.clone());

        let document = MedicalDocument::new("rec-1", "doc-1", true);
        document_id = document.id.clone();
        store.insert_document(&document).await.unwrap();

        mutator
            .review_document(
                &document_id,
                DocumentDecision::Reject,
                &Actor::new("adm-1", Role::Admin),
                Some("scan quality insufficient"),
            )
            .await
            .unwrap();
    }

    let reopened = FileStore::open(dir.0.clone()).await.unwrap();
    let document = reopened.get_document(&document_id).await.unwrap().unwrap();
    assert_eq!(document.status, DocumentStatus::FinalAdminRejected);
    assert_eq!(
        document.review_note.as_deref(),
        Some("scan quality insufficient")
    );
    assert!(document.reviewed_at.is_some());

    // The uploading doctor's notification was persisted too.
    let inbox = reopened.notifications_for("doc-1").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].document_id.as_deref(), Some(document_id.as_str()));
}

#[tokio::test]
async fn mark_read_is_durable() {
    let dir = TempDir::new();
    let notification_id;

    {
        let store = Arc::new(FileStore::open(dir.0.clone()).await.unwrap());
        let mutator = RecordMutator::new(store.clone(), store.clone(), store.clone());

        let record = ApplicationRecord::new_donor("rec-1", "donor-1", "Test Donor");
        store.insert_record(&record).await.unwrap();
        mutator
            .apply("rec-1", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
            .await
            .unwrap();

        let inbox = store.notifications_for("donor-1").await.unwrap();
        notification_id = inbox[0].id.clone();
        store.mark_read(&notification_id).await.unwrap();
    }

    let reopened = FileStore::open(dir.0.clone()).await.unwrap();
    let inbox = reopened.notifications_for("donor-1").await.unwrap();
    assert!(inbox[0].read);
}
