use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Approval pipeline statuses for donor and recipient application records.
///
/// This enum is the single source of truth for status values. Every other
/// component (transitions, eligibility, notifications, persistence) imports
/// it instead of spelling out string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    NeedsInfo,
    InitialDoctorApproved,
    PendingInitialAdminApproval,
    InitiallyApproved,
    DoctorApproved,
    AdminApproved,
    MedicalEvaluationInProgress,
    MedicalEvaluationCompleted,
    Approved,
    Rejected,
}

/// Every status, in pipeline order. Used by exhaustive table checks and the
/// `status` CLI summary.
pub const ALL_STATUSES: [RequestStatus; 11] = [
    RequestStatus::Pending,
    RequestStatus::NeedsInfo,
    RequestStatus::InitialDoctorApproved,
    RequestStatus::PendingInitialAdminApproval,
    RequestStatus::InitiallyApproved,
    RequestStatus::DoctorApproved,
    RequestStatus::AdminApproved,
    RequestStatus::MedicalEvaluationInProgress,
    RequestStatus::MedicalEvaluationCompleted,
    RequestStatus::Approved,
    RequestStatus::Rejected,
];

/// Sentinel label returned for raw status strings that fail to parse.
pub const UNKNOWN_STATUS_LABEL: &str = "Unknown Status";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized status literal: {literal:?}")]
pub struct UnknownStatus {
    pub literal: String,
}

impl RequestStatus {
    /// Canonical wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::NeedsInfo => "needs-info",
            RequestStatus::InitialDoctorApproved => "initial-doctor-approved",
            RequestStatus::PendingInitialAdminApproval => "pending-initial-admin-approval",
            RequestStatus::InitiallyApproved => "initially-approved",
            RequestStatus::DoctorApproved => "doctor-approved",
            RequestStatus::AdminApproved => "admin-approved",
            RequestStatus::MedicalEvaluationInProgress => "medical-evaluation-in-progress",
            RequestStatus::MedicalEvaluationCompleted => "medical-evaluation-completed",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Parse a canonical status string, failing fast on anything else.
    pub fn parse(raw: &str) -> Result<Self, UnknownStatus> {
        ALL_STATUSES
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| UnknownStatus {
                literal: raw.to_string(),
            })
    }

    /// Parse a status string, additionally accepting the legacy literals that
    /// pre-migration documents carry. Only ingestion normalization should use
    /// this; everything downstream works with the canonical enum.
    pub fn parse_with_aliases(raw: &str) -> Result<Self, UnknownStatus> {
        match raw {
            "Final Admin Approved" => Ok(RequestStatus::Approved),
            "Final Admin Rejected" => Ok(RequestStatus::Rejected),
            other => Self::parse(other),
        }
    }

    /// Human-readable label. Total: every variant has one.
    pub fn display(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending Review",
            RequestStatus::NeedsInfo => "More Information Needed",
            RequestStatus::InitialDoctorApproved => "Doctor Initial Approval",
            RequestStatus::PendingInitialAdminApproval => "Awaiting Admin Initial Review",
            RequestStatus::InitiallyApproved => "Initially Approved",
            RequestStatus::DoctorApproved => "Doctor Approved",
            RequestStatus::AdminApproved => "Admin Approved",
            RequestStatus::MedicalEvaluationInProgress => "Medical Evaluation In Progress",
            RequestStatus::MedicalEvaluationCompleted => "Medical Evaluation Completed",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }

    /// Presentation-layer hint tag for this status.
    pub fn color_class(&self) -> &'static str {
        match self {
            RequestStatus::Pending | RequestStatus::NeedsInfo => "warning",
            RequestStatus::InitialDoctorApproved
            | RequestStatus::PendingInitialAdminApproval
            | RequestStatus::DoctorApproved
            | RequestStatus::MedicalEvaluationInProgress => "info",
            RequestStatus::InitiallyApproved
            | RequestStatus::AdminApproved
            | RequestStatus::MedicalEvaluationCompleted
            | RequestStatus::Approved => "success",
            RequestStatus::Rejected => "danger",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Label for a raw status string that may not parse. Presentation code that
/// still holds legacy strings goes through here; it never fails.
pub fn display_raw(raw: &str) -> &'static str {
    RequestStatus::parse_with_aliases(raw)
        .map(|status| status.display())
        .unwrap_or(UNKNOWN_STATUS_LABEL)
}

/// Color tag for a raw status string; neutral tag when unrecognized.
pub fn color_class_raw(raw: &str) -> &'static str {
    RequestStatus::parse_with_aliases(raw)
        .map(|status| status.color_class())
        .unwrap_or("muted")
}

/// Lifecycle of a doctor-uploaded medical document. The wire strings are the
/// ones the legacy collection already contains, preserved for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStatus {
    #[serde(rename = "pending_admin_review")]
    PendingAdminReview,
    #[serde(rename = "Final Admin Approved")]
    FinalAdminApproved,
    #[serde(rename = "Final Admin Rejected")]
    FinalAdminRejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::PendingAdminReview => "pending_admin_review",
            DocumentStatus::FinalAdminApproved => "Final Admin Approved",
            DocumentStatus::FinalAdminRejected => "Final Admin Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::PendingAdminReview)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles known to the workflow engine, as supplied by the authentication
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Recipient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Recipient => "recipient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized role: {literal:?}")]
pub struct UnknownRole {
    pub literal: String,
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "donor" => Ok(Role::Donor),
            "recipient" => Ok(Role::Recipient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole {
                literal: other.to_string(),
            }),
        }
    }
}

/// Actions a role can perform on an application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Approve,
    Reject,
    InitialApprove,
    InitialReject,
    NeedsInfo,
    Submit,
}

pub const ALL_ACTIONS: [Action; 6] = [
    Action::Approve,
    Action::Reject,
    Action::InitialApprove,
    Action::InitialReject,
    Action::NeedsInfo,
    Action::Submit,
];

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::InitialApprove => "initial-approve",
            Action::InitialReject => "initial-reject",
            Action::NeedsInfo => "needs-info",
            Action::Submit => "submit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized action: {literal:?}")]
pub struct UnknownAction {
    pub literal: String,
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ALL_ACTIONS
            .into_iter()
            .find(|action| action.as_str() == raw)
            .ok_or_else(|| UnknownAction {
                literal: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_color_class_are_total_and_non_empty() {
        for status in ALL_STATUSES {
            assert!(!status.display().is_empty());
            assert!(!status.color_class().is_empty());
        }
    }

    #[test]
    fn display_raw_falls_back_for_unknown_literals() {
        assert_eq!(display_raw("not-a-status"), UNKNOWN_STATUS_LABEL);
        assert_eq!(display_raw(""), UNKNOWN_STATUS_LABEL);
        assert_eq!(color_class_raw("not-a-status"), "muted");
    }

    #[test]
    fn parse_round_trips_canonical_strings() {
        for status in ALL_STATUSES {
            assert_eq!(RequestStatus::parse(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn parse_fails_fast_on_legacy_literals() {
        assert!(RequestStatus::parse("Final Admin Approved").is_err());
        assert_eq!(
            RequestStatus::parse_with_aliases("Final Admin Approved"),
            Ok(RequestStatus::Approved)
        );
        assert_eq!(
            RequestStatus::parse_with_aliases("Final Admin Rejected"),
            Ok(RequestStatus::Rejected)
        );
    }

    #[test]
    fn serde_uses_canonical_wire_strings() {
        let json = serde_json::to_string(&RequestStatus::PendingInitialAdminApproval).unwrap();
        assert_eq!(json, "\"pending-initial-admin-approval\"");
        let back: RequestStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RequestStatus::PendingInitialAdminApproval);
    }

    #[test]
    fn document_status_preserves_legacy_wire_strings() {
        let json = serde_json::to_string(&DocumentStatus::FinalAdminApproved).unwrap();
        assert_eq!(json, "\"Final Admin Approved\"");
        assert!(DocumentStatus::FinalAdminApproved.is_terminal());
        assert!(!DocumentStatus::PendingAdminReview.is_terminal());
    }
}
