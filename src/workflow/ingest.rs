//! One-shot normalization of raw legacy documents into typed records.
//!
//! Legacy records were written by several generations of client code: field
//! names vary (`donorName` vs a nested `userData.name`/`userData.fullName`),
//! status literals drift, and flags may be absent. All of that is resolved
//! here, once, at ingestion. Downstream code works with `ApplicationRecord`
//! and never does defensive lookups.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::status::{RequestStatus, UnknownStatus};
use super::types::ApplicationRecord;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("record is missing an id")]
    MissingId,
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}

/// Normalize one raw document into a strongly-typed record, defaulting
/// missing fields. Fails fast on an unrecognized status literal instead of
/// silently treating the record as unknown.
pub fn normalize_record(raw: &Value) -> Result<ApplicationRecord, IngestError> {
    let id = string_field(raw, &["id", "_id"]).ok_or(IngestError::MissingId)?;

    let applicant_name = string_field(raw, &["donorName", "recipientName", "name"])
        .or_else(|| nested_string_field(raw, "userData", &["name", "fullName"]))
        .unwrap_or_else(|| "Unknown".to_string());

    let status_literal =
        string_field(raw, &["requestStatus", "status"]).unwrap_or_else(|| "pending".to_string());
    let status = RequestStatus::parse_with_aliases(&status_literal)?;

    let created_at = date_field(raw, "createdAt").unwrap_or_else(Utc::now);

    let mut record = ApplicationRecord {
        id,
        donor_id: string_field(raw, &["donorId"]),
        recipient_id: string_field(raw, &["recipientId"]),
        applicant_name,
        doctor_id: string_field(raw, &["doctorId"]),
        admin_id: string_field(raw, &["adminId"]),
        request_status: status,
        status,
        doctor_comment: string_field(raw, &["doctorComment"]),
        admin_comment: string_field(raw, &["adminComment"]),
        rejection_reason: string_field(raw, &["rejectionReason"]),
        override_reason: string_field(raw, &["overrideReason"]),
        initial_approval_date: date_field(raw, "initialApprovalDate"),
        admin_approval_date: date_field(raw, "adminApprovalDate"),
        rejection_date: date_field(raw, "rejectionDate"),
        final_evaluation_date: date_field(raw, "finalEvaluationDate"),
        auto_transitioned: bool_field(raw, "autoTransitioned"),
        doctor_reviewed: bool_field(raw, "doctorReviewed"),
        admin_reviewed: bool_field(raw, "adminReviewed"),
        eligible_for_appointments: false,
        medical_evaluation_completed: false,
        created_at,
        updated_at: date_field(raw, "updatedAt").unwrap_or(created_at),
    };
    // The stored flags may disagree with the status; the status wins.
    record.sync_derived_flags();
    Ok(record)
}

fn string_field(raw: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}

fn nested_string_field(raw: &Value, outer: &str, candidates: &[&str]) -> Option<String> {
    raw.get(outer)
        .and_then(|inner| string_field(inner, candidates))
}

fn bool_field(raw: &Value, key: &str) -> bool {
    raw.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn date_field(raw: &Value, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key)
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}
