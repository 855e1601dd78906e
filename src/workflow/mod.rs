// Approval workflow engine: status registry, transition table, eligibility,
// record mutation with audit trail, and notification dispatch.

pub mod eligibility;
pub mod ingest;
pub mod mutator;
pub mod notifications;
pub mod status;
pub mod transitions;
pub mod types;

#[cfg(test)]
mod tests;

pub use eligibility::{can_act, can_schedule_appointments};
pub use ingest::{normalize_record, IngestError};
pub use mutator::{DocumentDecision, RecordMutator, TransitionError, TransitionOutcome};
pub use notifications::{describe, NotificationContent, NotificationDispatcher};
pub use status::{Action, DocumentStatus, RequestStatus, Role, UnknownStatus};
pub use transitions::{auto_next_status, next_status, APPROVED_OR_LATER};
pub use types::{Actor, ApplicationRecord, ApprovalHistoryEntry, MedicalDocument, Notification};
