//! The approval transition table.
//!
//! Transitions live in one flat table rather than branching logic so the set
//! of legal state changes stays auditable in one place. An illegal transition
//! is trivially detectable: the lookup returns the input status unchanged.

use super::status::{Action, RequestStatus, Role};

use RequestStatus::*;

/// Every legal (role, action, from) -> to mapping.
const TRANSITIONS: &[(Role, Action, RequestStatus, RequestStatus)] = &[
    // Doctor initial review.
    (Role::Doctor, Action::InitialApprove, Pending, InitialDoctorApproved),
    (Role::Doctor, Action::InitialReject, Pending, Rejected),
    // Doctor generic review and medical evaluation.
    (Role::Doctor, Action::Approve, Pending, DoctorApproved),
    (Role::Doctor, Action::Reject, Pending, Rejected),
    (Role::Doctor, Action::Approve, InitiallyApproved, MedicalEvaluationInProgress),
    (Role::Doctor, Action::Approve, MedicalEvaluationInProgress, MedicalEvaluationCompleted),
    (Role::Doctor, Action::Reject, MedicalEvaluationInProgress, Rejected),
    (Role::Doctor, Action::NeedsInfo, Pending, NeedsInfo),
    // Admin confirmation and override paths. Confirming a doctor decision and
    // overriding it land on different statuses; the override branch always
    // demands a reason (enforced by the mutator, not here).
    (Role::Admin, Action::InitialApprove, PendingInitialAdminApproval, InitiallyApproved),
    (Role::Admin, Action::InitialReject, PendingInitialAdminApproval, Rejected),
    (Role::Admin, Action::Approve, DoctorApproved, AdminApproved),
    (Role::Admin, Action::Reject, DoctorApproved, Rejected),
    (Role::Admin, Action::Approve, MedicalEvaluationCompleted, Approved),
    (Role::Admin, Action::Reject, MedicalEvaluationCompleted, Rejected),
    (Role::Admin, Action::Reject, Pending, Rejected),
    (Role::Admin, Action::NeedsInfo, Pending, NeedsInfo),
    // Applicant resubmission and appeal.
    (Role::Recipient, Action::Submit, NeedsInfo, Pending),
    (Role::Recipient, Action::Submit, Rejected, Pending),
    (Role::Donor, Action::Submit, NeedsInfo, Pending),
    (Role::Donor, Action::Submit, Rejected, Pending),
];

/// Next status for (role, action, current). Returns `current` unchanged when
/// no mapping exists: a no-op, not an error. Callers are expected to have
/// checked eligibility already; the table itself is defensive.
pub fn next_status(role: Role, action: Action, current: RequestStatus) -> RequestStatus {
    TRANSITIONS
        .iter()
        .find(|(r, a, from, _)| *r == role && *a == action && *from == current)
        .map(|(_, _, _, to)| *to)
        .unwrap_or(current)
}

/// The one automatic (no human actor) transition: a doctor's initial approval
/// is queued for admin initial review without anyone clicking a button.
pub fn auto_next_status(current: RequestStatus) -> Option<RequestStatus> {
    match current {
        InitialDoctorApproved => Some(PendingInitialAdminApproval),
        _ => None,
    }
}

/// An override is an admin rejection that contradicts a prior doctor
/// decision. Overrides carry a mandatory justification.
pub fn is_override(role: Role, action: Action, current: RequestStatus) -> bool {
    role == Role::Admin
        && matches!(
            (action, current),
            (Action::Reject, DoctorApproved)
                | (Action::Reject, MedicalEvaluationCompleted)
                | (Action::InitialReject, PendingInitialAdminApproval)
        )
}

pub fn is_rejection(action: Action) -> bool {
    matches!(action, Action::Reject | Action::InitialReject)
}

/// Whether a non-empty free-text reason is mandatory for this transition.
pub fn requires_reason(role: Role, action: Action, current: RequestStatus) -> bool {
    is_rejection(action) || is_override(role, action, current)
}

/// A final decision closes the record: the final admin approval, or a
/// rejection of a completed medical evaluation.
pub fn is_final_decision(current: RequestStatus, next: RequestStatus) -> bool {
    next == Approved || (current == MedicalEvaluationCompleted && next == Rejected)
}

/// Statuses at or past initial approval. This is the single declared set that
/// appointment eligibility and the `eligible_for_appointments` record flag
/// derive from; nothing else maintains its own copy.
pub const APPROVED_OR_LATER: [RequestStatus; 5] = [
    InitiallyApproved,
    AdminApproved,
    Approved,
    MedicalEvaluationInProgress,
    MedicalEvaluationCompleted,
];

pub fn approved_or_later(status: RequestStatus) -> bool {
    APPROVED_OR_LATER.contains(&status)
}
