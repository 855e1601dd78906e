// Mutator behavior against the in-memory store.

use std::sync::Arc;

use super::mutator::{DocumentDecision, RecordMutator, TransitionError};
use super::status::{Action, DocumentStatus, RequestStatus, Role};
use super::types::{Actor, ApplicationRecord, MedicalDocument};
use crate::store::{MemoryStore, NotificationStore, RecordStore};

fn mutator_over(store: &Arc<MemoryStore>) -> RecordMutator {
    RecordMutator::new(store.clone(), store.clone(), store.clone())
}

async fn seed_record(store: &MemoryStore, status: RequestStatus) -> ApplicationRecord {
    let mut record = ApplicationRecord::new_donor("rec-1", "donor-1", "Test Donor");
    record.set_status(status, chrono::Utc::now());
    store.insert_record(&record).await.unwrap();
    record
}

#[tokio::test]
async fn doctor_then_admin_approval_produces_two_ordered_history_entries() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::Pending).await;

    let doctor = Actor::new("doc-1", Role::Doctor);
    let outcome = mutator
        .apply("rec-1", Action::Approve, &doctor, None)
        .await
        .unwrap();
    assert_eq!(outcome.new_status, RequestStatus::DoctorApproved);

    let admin = Actor::new("adm-1", Role::Admin);
    let outcome = mutator
        .apply("rec-1", Action::Approve, &admin, None)
        .await
        .unwrap();
    assert_eq!(outcome.new_status, RequestStatus::AdminApproved);

    let history = store.history_for("rec-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].previous_status, RequestStatus::Pending);
    assert_eq!(history[0].new_status, RequestStatus::DoctorApproved);
    assert_eq!(history[1].previous_status, RequestStatus::DoctorApproved);
    assert_eq!(history[1].new_status, RequestStatus::AdminApproved);
    assert!(!history[1].is_override);

    let record = store.get_record("rec-1").await.unwrap().unwrap();
    assert_eq!(record.status, RequestStatus::AdminApproved);
    assert!(record.doctor_reviewed);
    assert!(record.admin_reviewed);
    assert!(record.admin_approval_date.is_some());
}

#[tokio::test]
async fn admin_override_rejects_with_mandatory_reason() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::DoctorApproved).await;

    let admin = Actor::new("adm-1", Role::Admin);
    let outcome = mutator
        .apply("rec-1", Action::Reject, &admin, Some("clinical concern"))
        .await
        .unwrap();
    assert_eq!(outcome.new_status, RequestStatus::Rejected);

    let history = store.history_for("rec-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_override);
    assert_eq!(history[0].reason.as_deref(), Some("clinical concern"));

    let record = store.get_record("rec-1").await.unwrap().unwrap();
    assert_eq!(record.override_reason.as_deref(), Some("clinical concern"));
    assert_eq!(record.rejection_reason.as_deref(), Some("clinical concern"));
    assert!(record.rejection_date.is_some());
}

#[tokio::test]
async fn rejection_without_reason_never_reaches_the_store() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    let before = seed_record(&store, RequestStatus::DoctorApproved).await;

    let admin = Actor::new("adm-1", Role::Admin);
    for reason in [None, Some(""), Some("   \t")] {
        let err = mutator
            .apply("rec-1", Action::Reject, &admin, reason)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::ReasonRequired { .. }));
    }

    // No partial write: record untouched, no history, no notifications.
    let after = store.get_record("rec-1").await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(store.history_len().await, 0);
    assert_eq!(store.notification_count().await, 0);
}

#[tokio::test]
async fn automatic_advance_sets_flag_and_needs_no_reason() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    let before = seed_record(&store, RequestStatus::InitialDoctorApproved).await;

    let outcome = mutator.apply_auto("rec-1").await.unwrap();
    assert!(outcome.changed);
    assert_eq!(
        outcome.new_status,
        RequestStatus::PendingInitialAdminApproval
    );

    let record = store.get_record("rec-1").await.unwrap().unwrap();
    assert!(record.auto_transitioned);
    assert!(record.updated_at >= before.updated_at);

    let history = store.history_for("rec-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].auto_transitioned);
    assert_eq!(history[0].actor_id, None);
    assert_eq!(history[0].reason, None);
}

#[tokio::test]
async fn automatic_advance_is_a_no_op_elsewhere() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::Pending).await;

    let outcome = mutator.apply_auto("rec-1").await.unwrap();
    assert!(!outcome.changed);
    assert_eq!(store.history_len().await, 0);
}

#[tokio::test]
async fn reapplying_an_action_at_the_target_status_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::Pending).await;

    let doctor = Actor::new("doc-1", Role::Doctor);
    mutator
        .apply("rec-1", Action::Approve, &doctor, None)
        .await
        .unwrap();
    let second = mutator
        .apply("rec-1", Action::Approve, &doctor, None)
        .await
        .unwrap();
    assert!(!second.changed);
    assert_eq!(second.new_status, RequestStatus::DoctorApproved);
    assert_eq!(store.history_len().await, 1);
}

#[tokio::test]
async fn missing_record_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);

    let err = mutator
        .apply("nope", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::RecordNotFound { .. }));
}

#[tokio::test]
async fn notification_failure_does_not_block_the_transition() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::Pending).await;
    store.set_fail_notifications(true);

    let outcome = mutator
        .apply("rec-1", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
        .await
        .unwrap();
    assert_eq!(outcome.new_status, RequestStatus::DoctorApproved);
    assert_eq!(store.history_len().await, 1);
    assert_eq!(store.notification_count().await, 0);
}

#[tokio::test]
async fn transitions_notify_the_affected_counterparts() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    seed_record(&store, RequestStatus::Pending).await;

    mutator
        .apply("rec-1", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
        .await
        .unwrap();
    let donor_inbox = store.notifications_for("donor-1").await.unwrap();
    assert_eq!(donor_inbox.len(), 1);
    assert_eq!(donor_inbox[0].title, "Doctor Approval");
    assert!(!donor_inbox[0].read);

    // Admin override also notifies the doctor who approved.
    mutator
        .apply(
            "rec-1",
            Action::Reject,
            &Actor::new("adm-1", Role::Admin),
            Some("clinical concern"),
        )
        .await
        .unwrap();
    let doctor_inbox = store.notifications_for("doc-1").await.unwrap();
    assert_eq!(doctor_inbox.len(), 1);
    assert_eq!(doctor_inbox[0].title, "Decision Overridden");
}

#[tokio::test]
async fn document_review_is_terminal_after_one_decision() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    let document = MedicalDocument::new("rec-1", "doc-1", true);
    crate::store::DocumentStore::insert_document(store.as_ref(), &document)
        .await
        .unwrap();

    let admin = Actor::new("adm-1", Role::Admin);
    let status = mutator
        .review_document(&document.id, DocumentDecision::Approve, &admin, None)
        .await
        .unwrap();
    assert_eq!(status, DocumentStatus::FinalAdminApproved);

    let err = mutator
        .review_document(&document.id, DocumentDecision::Reject, &admin, Some("late"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::DocumentAlreadyReviewed { .. }));

    // The uploading doctor was told about the decision.
    let doctor_inbox = store.notifications_for("doc-1").await.unwrap();
    assert_eq!(doctor_inbox.len(), 1);
    assert_eq!(doctor_inbox[0].kind, "document-review");
}

#[tokio::test]
async fn document_rejection_requires_a_note() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    let document = MedicalDocument::new("rec-1", "doc-1", false);
    crate::store::DocumentStore::insert_document(store.as_ref(), &document)
        .await
        .unwrap();

    let admin = Actor::new("adm-1", Role::Admin);
    let err = mutator
        .review_document(&document.id, DocumentDecision::Reject, &admin, Some("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::ReviewNoteRequired { .. }));

    let stored = crate::store::DocumentStore::get_document(store.as_ref(), &document.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, DocumentStatus::PendingAdminReview);
}

#[tokio::test]
async fn concurrent_transition_surfaces_as_conflict() {
    let store = Arc::new(MemoryStore::new());
    let mutator = mutator_over(&store);
    let mut stale = seed_record(&store, RequestStatus::Pending).await;

    // First actor wins.
    mutator
        .apply("rec-1", Action::Approve, &Actor::new("doc-1", Role::Doctor), None)
        .await
        .unwrap();

    // Simulate a second actor who loaded the record before the first commit:
    // their conditional write must fail rather than silently overwrite.
    stale.set_status(RequestStatus::NeedsInfo, chrono::Utc::now());
    let entry = super::types::ApprovalHistoryEntry {
        id: "stale-entry".to_string(),
        record_id: "rec-1".to_string(),
        previous_status: RequestStatus::Pending,
        new_status: RequestStatus::NeedsInfo,
        actor_id: Some("adm-1".to_string()),
        actor_role: Some(Role::Admin),
        reason: None,
        is_override: false,
        is_final_decision: false,
        auto_transitioned: false,
        created_at: chrono::Utc::now(),
    };
    let err = store
        .commit_transition(&stale, RequestStatus::Pending, &entry)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::store::StoreError::Conflict { .. }));
    assert_eq!(store.history_len().await, 1);
}
