// Donorflow Library - Approval Workflow Engine
// This exposes the core components for testing and integration

pub mod config;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, DonorflowConfig};
pub use store::{DocumentStore, FileStore, MemoryStore, NotificationStore, RecordStore, StoreError};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    can_act, can_schedule_appointments, describe, normalize_record, Action, Actor,
    ApplicationRecord, ApprovalHistoryEntry, DocumentDecision, DocumentStatus, MedicalDocument,
    Notification, NotificationDispatcher, RecordMutator, RequestStatus, Role, TransitionError,
    TransitionOutcome,
};
