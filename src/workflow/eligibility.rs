//! Eligibility checks gated on a record's current status.
//!
//! Both predicates are derived, not maintained: `can_act` falls out of the
//! transition table, and `can_schedule_appointments` reads the one declared
//! `APPROVED_OR_LATER` set. Unknown combinations deny by default.

use super::status::{Action, RequestStatus, Role};
use super::transitions::{approved_or_later, next_status};

/// Whether `role` may perform `action` on a record at `status`. Derived from
/// the transition table: an action is allowed exactly when it maps somewhere.
pub fn can_act(status: RequestStatus, role: Role, action: Action) -> bool {
    next_status(role, action, status) != status
}

/// Whether appointment scheduling is open for this record. Doctors can always
/// schedule; everyone else only once the record is sufficiently approved.
pub fn can_schedule_appointments(status: RequestStatus, role: Role) -> bool {
    match role {
        Role::Doctor => true,
        _ => approved_or_later(status),
    }
}
