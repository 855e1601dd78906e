//! Core entities of the approval workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{DocumentStatus, RequestStatus, Role};
use super::transitions::approved_or_later;

/// The opaque `{id, role}` pair supplied by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// A donor's or recipient's application under review.
///
/// `status` is the legacy duplicate of `request_status`; both are written on
/// every transition. Timestamp fields are written once, at the instant the
/// corresponding transition occurs, never retroactively edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub donor_id: Option<String>,
    pub recipient_id: Option<String>,
    pub applicant_name: String,
    pub doctor_id: Option<String>,
    pub admin_id: Option<String>,
    pub request_status: RequestStatus,
    pub status: RequestStatus,
    pub doctor_comment: Option<String>,
    pub admin_comment: Option<String>,
    pub rejection_reason: Option<String>,
    pub override_reason: Option<String>,
    pub initial_approval_date: Option<DateTime<Utc>>,
    pub admin_approval_date: Option<DateTime<Utc>>,
    pub rejection_date: Option<DateTime<Utc>>,
    pub final_evaluation_date: Option<DateTime<Utc>>,
    pub auto_transitioned: bool,
    pub doctor_reviewed: bool,
    pub admin_reviewed: bool,
    pub eligible_for_appointments: bool,
    pub medical_evaluation_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn new_donor(id: impl Into<String>, donor_id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut record = Self::blank(id, name);
        record.donor_id = Some(donor_id.into());
        record
    }

    pub fn new_recipient(
        id: impl Into<String>,
        recipient_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut record = Self::blank(id, name);
        record.recipient_id = Some(recipient_id.into());
        record
    }

    fn blank(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            donor_id: None,
            recipient_id: None,
            applicant_name: name.into(),
            doctor_id: None,
            admin_id: None,
            request_status: RequestStatus::Pending,
            status: RequestStatus::Pending,
            doctor_comment: None,
            admin_comment: None,
            rejection_reason: None,
            override_reason: None,
            initial_approval_date: None,
            admin_approval_date: None,
            rejection_date: None,
            final_evaluation_date: None,
            auto_transitioned: false,
            doctor_reviewed: false,
            admin_reviewed: false,
            eligible_for_appointments: false,
            medical_evaluation_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// User id of the applicant this record belongs to, donor or recipient.
    pub fn applicant_id(&self) -> Option<&str> {
        self.donor_id.as_deref().or(self.recipient_id.as_deref())
    }

    pub fn applicant_role(&self) -> Role {
        if self.donor_id.is_some() {
            Role::Donor
        } else {
            Role::Recipient
        }
    }

    /// Write a new status to both status fields and recompute the flags that
    /// are pure functions of it. The only place status is assigned.
    pub fn set_status(&mut self, next: RequestStatus, now: DateTime<Utc>) {
        self.request_status = next;
        self.status = next;
        self.updated_at = now;
        self.sync_derived_flags();
    }

    /// Recompute the denormalized flags from the current status.
    /// `doctor_reviewed` / `admin_reviewed` are set-once by the mutator based
    /// on the acting role, since a `rejected` status alone does not identify
    /// which role decided.
    pub fn sync_derived_flags(&mut self) {
        self.eligible_for_appointments = approved_or_later(self.request_status);
        self.medical_evaluation_completed = matches!(
            self.request_status,
            RequestStatus::MedicalEvaluationCompleted | RequestStatus::Approved
        );
    }
}

/// Immutable audit record of one transition. Append-only; never mutated or
/// deleted after creation. `actor_id`/`actor_role` are `None` for the
/// automatic advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    pub id: String,
    pub record_id: String,
    pub previous_status: RequestStatus,
    pub new_status: RequestStatus,
    pub actor_id: Option<String>,
    pub actor_role: Option<Role>,
    pub reason: Option<String>,
    pub is_override: bool,
    pub is_final_decision: bool,
    pub auto_transitioned: bool,
    pub created_at: DateTime<Utc>,
}

/// Append-only message addressed to one user. `read` is the only mutable
/// field, flipped false -> true when the user consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub kind: String,
    pub subtype: String,
    pub record_id: Option<String>,
    pub document_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A doctor-produced medical fitness evaluation. Created by the upload flow,
/// reviewed exactly once by an admin, terminal afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDocument {
    pub id: String,
    pub donor_id: String,
    pub doctor_id: String,
    pub medically_fit: bool,
    pub status: DocumentStatus,
    pub admin_id: Option<String>,
    pub review_note: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl MedicalDocument {
    pub fn new(
        donor_id: impl Into<String>,
        doctor_id: impl Into<String>,
        medically_fit: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            donor_id: donor_id.into(),
            doctor_id: doctor_id.into(),
            medically_fit,
            status: DocumentStatus::PendingAdminReview,
            admin_id: None,
            review_note: None,
            uploaded_at: Utc::now(),
            reviewed_at: None,
        }
    }
}
