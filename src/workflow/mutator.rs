//! The record mutator: applies one transition to one application record as a
//! unit of work, with its audit entry and best-effort notifications.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::notifications::NotificationDispatcher;
use super::status::{Action, DocumentStatus, RequestStatus, Role};
use super::transitions;
use super::types::{Actor, ApplicationRecord, ApprovalHistoryEntry};
use crate::store::{DocumentStore, NotificationStore, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("application record not found: {id}")]
    RecordNotFound { id: String },
    #[error("medical document not found: {id}")]
    DocumentNotFound { id: String },
    #[error("a non-empty reason is required for {action} on a {status} record")]
    ReasonRequired { action: Action, status: RequestStatus },
    #[error("record {id} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: String,
        actual: String,
    },
    #[error("document {id} has already received a final decision")]
    DocumentAlreadyReviewed { id: String },
    #[error("a non-empty note is required to reject document {id}")]
    ReviewNoteRequired { id: String },
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of applying a transition. `changed == false` means the (role,
/// action, status) triple had no mapping and the call was a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub record_id: String,
    pub previous_status: RequestStatus,
    pub new_status: RequestStatus,
    pub changed: bool,
}

/// An admin's decision on a medical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentDecision {
    Approve,
    Reject,
}

pub struct RecordMutator {
    records: Arc<dyn RecordStore>,
    documents: Arc<dyn DocumentStore>,
    dispatcher: NotificationDispatcher,
}

impl RecordMutator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        documents: Arc<dyn DocumentStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            records,
            documents,
            dispatcher: NotificationDispatcher::new(notifications),
        }
    }

    /// Apply one transition to one record.
    ///
    /// Order of operations: load, validate the reason precondition (before
    /// any write), compute the next status, stamp the record, commit the
    /// record update together with its history entry conditional on the
    /// expected previous status, then dispatch notifications best-effort.
    pub async fn apply(
        &self,
        record_id: &str,
        action: Action,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut record = self.load_record(record_id).await?;
        let previous = record.request_status;

        let overriding = transitions::is_override(actor.role, action, previous);
        let reason_text = reason
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        if transitions::requires_reason(actor.role, action, previous) && reason_text.is_none() {
            return Err(TransitionError::ReasonRequired {
                action,
                status: previous,
            });
        }

        let next = transitions::next_status(actor.role, action, previous);
        if next == previous {
            info!(
                record_id = %record_id,
                role = %actor.role,
                action = %action,
                status = %previous,
                "No transition mapped; leaving record unchanged"
            );
            return Ok(TransitionOutcome {
                record_id: record_id.to_string(),
                previous_status: previous,
                new_status: previous,
                changed: false,
            });
        }

        let now = Utc::now();
        record.set_status(next, now);
        record.auto_transitioned = false;
        match actor.role {
            Role::Doctor => {
                record.doctor_reviewed = true;
                if record.doctor_id.is_none() {
                    record.doctor_id = Some(actor.id.clone());
                }
                if let Some(text) = &reason_text {
                    record.doctor_comment = Some(text.clone());
                }
            }
            Role::Admin => {
                record.admin_reviewed = true;
                record.admin_id = Some(actor.id.clone());
                if let Some(text) = &reason_text {
                    record.admin_comment = Some(text.clone());
                }
            }
            Role::Donor | Role::Recipient => {}
        }
        match next {
            RequestStatus::Rejected => {
                record.rejection_date = Some(now);
                record.rejection_reason = reason_text.clone();
                if overriding {
                    record.override_reason = reason_text.clone();
                }
            }
            RequestStatus::InitiallyApproved => record.initial_approval_date = Some(now),
            RequestStatus::AdminApproved | RequestStatus::Approved => {
                record.admin_approval_date = Some(now)
            }
            RequestStatus::MedicalEvaluationCompleted => {
                record.final_evaluation_date = Some(now)
            }
            _ => {}
        }

        let entry = ApprovalHistoryEntry {
            id: Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            previous_status: previous,
            new_status: next,
            actor_id: Some(actor.id.clone()),
            actor_role: Some(actor.role),
            reason: reason_text,
            is_override: overriding,
            is_final_decision: transitions::is_final_decision(previous, next),
            auto_transitioned: false,
            created_at: now,
        };
        self.commit(&record, previous, &entry).await?;

        info!(
            record_id = %record_id,
            actor_id = %actor.id,
            role = %actor.role,
            action = %action,
            previous_status = %previous,
            new_status = %next,
            is_override = overriding,
            "Transition applied"
        );

        self.notify_counterparts(&record, next, actor.role).await;

        Ok(TransitionOutcome {
            record_id: record_id.to_string(),
            previous_status: previous,
            new_status: next,
            changed: true,
        })
    }

    /// The automatic advance: no human actor, no reason, flagged
    /// `auto_transitioned` with a fresh timestamp. Records without an
    /// automatic transition from their current status are left unchanged.
    pub async fn apply_auto(&self, record_id: &str) -> Result<TransitionOutcome, TransitionError> {
        let mut record = self.load_record(record_id).await?;
        let previous = record.request_status;

        let Some(next) = transitions::auto_next_status(previous) else {
            return Ok(TransitionOutcome {
                record_id: record_id.to_string(),
                previous_status: previous,
                new_status: previous,
                changed: false,
            });
        };

        let now = Utc::now();
        record.set_status(next, now);
        record.auto_transitioned = true;

        let entry = ApprovalHistoryEntry {
            id: Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            previous_status: previous,
            new_status: next,
            actor_id: None,
            actor_role: None,
            reason: None,
            is_override: false,
            is_final_decision: false,
            auto_transitioned: true,
            created_at: now,
        };
        self.commit(&record, previous, &entry).await?;

        info!(
            record_id = %record_id,
            previous_status = %previous,
            new_status = %next,
            "Automatic transition applied"
        );

        if let Some(user_id) = record.applicant_id() {
            self.dispatcher
                .send(user_id, next, record.applicant_role(), &record.id)
                .await;
        }

        Ok(TransitionOutcome {
            record_id: record_id.to_string(),
            previous_status: previous,
            new_status: next,
            changed: true,
        })
    }

    /// Record an admin's decision on a medical document. Documents are
    /// reviewed exactly once; a second decision fails. Rejections require a
    /// non-empty note.
    pub async fn review_document(
        &self,
        document_id: &str,
        decision: DocumentDecision,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DocumentStatus, TransitionError> {
        let mut document = self
            .documents
            .get_document(document_id)
            .await?
            .ok_or_else(|| TransitionError::DocumentNotFound {
                id: document_id.to_string(),
            })?;

        if document.status.is_terminal() {
            return Err(TransitionError::DocumentAlreadyReviewed {
                id: document_id.to_string(),
            });
        }

        let note_text = note
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let next = match decision {
            DocumentDecision::Approve => DocumentStatus::FinalAdminApproved,
            DocumentDecision::Reject => {
                if note_text.is_none() {
                    return Err(TransitionError::ReviewNoteRequired {
                        id: document_id.to_string(),
                    });
                }
                DocumentStatus::FinalAdminRejected
            }
        };

        document.status = next;
        document.admin_id = Some(actor.id.clone());
        document.review_note = note_text;
        document.reviewed_at = Some(Utc::now());

        match self
            .documents
            .finalize_document(&document, DocumentStatus::PendingAdminReview)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                return Err(TransitionError::DocumentAlreadyReviewed {
                    id: document_id.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            document_id = %document_id,
            admin_id = %actor.id,
            decision = %next,
            "Medical document reviewed"
        );

        self.dispatcher
            .send_document_review(&document.doctor_id, &document)
            .await;

        Ok(next)
    }

    async fn load_record(&self, record_id: &str) -> Result<ApplicationRecord, TransitionError> {
        self.records
            .get_record(record_id)
            .await?
            .ok_or_else(|| TransitionError::RecordNotFound {
                id: record_id.to_string(),
            })
    }

    async fn commit(
        &self,
        record: &ApplicationRecord,
        expected: RequestStatus,
        entry: &ApprovalHistoryEntry,
    ) -> Result<(), TransitionError> {
        match self.records.commit_transition(record, expected, entry).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict { expected, actual }) => Err(TransitionError::Conflict {
                id: record.id.clone(),
                expected,
                actual,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Notify the affected counterpart users of the new status: the applicant
    /// always, and the doctor when an admin acted on their decision.
    async fn notify_counterparts(
        &self,
        record: &ApplicationRecord,
        next: RequestStatus,
        acting_role: Role,
    ) {
        if let Some(user_id) = record.applicant_id() {
            self.dispatcher
                .send(user_id, next, record.applicant_role(), &record.id)
                .await;
        }
        if acting_role == Role::Admin {
            if let Some(doctor_id) = &record.doctor_id {
                self.dispatcher
                    .send(doctor_id, next, Role::Doctor, &record.id)
                    .await;
            }
        }
        if acting_role == Role::Doctor && next == RequestStatus::DoctorApproved {
            if let Some(admin_id) = &record.admin_id {
                self.dispatcher
                    .send(admin_id, next, Role::Admin, &record.id)
                    .await;
            }
        }
    }
}
