//! Status-change notifications.
//!
//! `describe` is a total, pure mapping from (new status, recipient role) to a
//! title/message pair; `NotificationDispatcher` persists the result. Delivery
//! is best effort: a failed append is logged and swallowed, it never rolls
//! back or blocks the transition that triggered it.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::status::{RequestStatus, Role};
use super::types::{MedicalDocument, Notification};
use crate::store::NotificationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub message: String,
}

fn content(title: &str, message: impl Into<String>) -> NotificationContent {
    NotificationContent {
        title: title.to_string(),
        message: message.into(),
    }
}

/// Title/message pair for a status change, addressed to `role`. Unmapped
/// combinations get the generic "Status Update" pair; this never fails.
pub fn describe(status: RequestStatus, role: Role) -> NotificationContent {
    use RequestStatus::*;
    let applicant = matches!(role, Role::Donor | Role::Recipient);
    match status {
        InitialDoctorApproved if applicant => content(
            "Doctor Initial Approval",
            "A doctor has given your application its initial approval. It now moves to admin review.",
        ),
        PendingInitialAdminApproval if applicant => content(
            "Awaiting Admin Review",
            "Your application has been queued for an administrator's initial review.",
        ),
        InitiallyApproved if applicant => content(
            "Application Initially Approved",
            "Your application has been initially approved. You may now schedule appointments.",
        ),
        DoctorApproved if applicant => content(
            "Doctor Approval",
            "A doctor has approved your application. An administrator will confirm the decision.",
        ),
        DoctorApproved if role == Role::Admin => content(
            "Application Ready for Review",
            "A doctor-approved application is waiting for your confirmation.",
        ),
        AdminApproved if applicant => content(
            "Application Approved",
            "An administrator has confirmed your application's approval.",
        ),
        MedicalEvaluationInProgress if applicant => content(
            "Medical Evaluation Started",
            "Your medical evaluation is underway.",
        ),
        MedicalEvaluationCompleted if applicant => content(
            "Medical Evaluation Completed",
            "Your medical evaluation is complete and awaiting the final decision.",
        ),
        Approved if applicant => content(
            "Final Approval",
            "Congratulations - your application has received final approval.",
        ),
        Rejected if applicant => content(
            "Application Rejected",
            "Your application has been rejected. You may appeal by resubmitting.",
        ),
        Rejected if role == Role::Doctor => content(
            "Decision Overridden",
            "An administrator has rejected an application you approved.",
        ),
        NeedsInfo if applicant => content(
            "More Information Needed",
            "Your application needs more information before review can continue.",
        ),
        Pending if role == Role::Doctor => content(
            "Application Resubmitted",
            "An application has been resubmitted and is pending your review.",
        ),
        other => content(
            "Status Update",
            format!("The application status changed to {}.", other.display()),
        ),
    }
}

/// Persists notifications produced as a side effect of transitions.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Persist a status-change notification for `user_id`. Best effort.
    pub async fn send(&self, user_id: &str, status: RequestStatus, role: Role, record_id: &str) {
        let NotificationContent { title, message } = describe(status, role);
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            message,
            read: false,
            kind: "status-update".to_string(),
            subtype: status.as_str().to_string(),
            record_id: Some(record_id.to_string()),
            document_id: None,
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.append_notification(&notification).await {
            warn!(
                user_id = %user_id,
                record_id = %record_id,
                status = %status,
                error = %err,
                "Failed to deliver status notification"
            );
        }
    }

    /// Notify the uploading doctor of an admin's document decision.
    pub async fn send_document_review(&self, user_id: &str, document: &MedicalDocument) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: "Medical Document Reviewed".to_string(),
            message: format!(
                "An administrator marked your medical document as {}.",
                document.status
            ),
            read: false,
            kind: "document-review".to_string(),
            subtype: document.status.as_str().to_string(),
            record_id: Some(document.donor_id.clone()),
            document_id: Some(document.id.clone()),
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.append_notification(&notification).await {
            warn!(
                user_id = %user_id,
                document_id = %document.id,
                error = %err,
                "Failed to deliver document review notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::status::ALL_STATUSES;

    #[test]
    fn describe_is_total_and_non_empty() {
        for status in ALL_STATUSES {
            for role in [Role::Donor, Role::Recipient, Role::Doctor, Role::Admin] {
                let content = describe(status, role);
                assert!(!content.title.is_empty());
                assert!(!content.message.is_empty());
            }
        }
    }

    #[test]
    fn unmapped_combinations_fall_back_to_generic_pair() {
        let content = describe(RequestStatus::AdminApproved, Role::Admin);
        assert_eq!(content.title, "Status Update");
        assert!(content.message.contains("Admin Approved"));
    }

    #[test]
    fn override_notifies_the_doctor() {
        let content = describe(RequestStatus::Rejected, Role::Doctor);
        assert_eq!(content.title, "Decision Overridden");
    }
}
