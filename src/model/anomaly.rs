use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// What kind of deviation was detected for an employee-day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyKind {
    /// First punch after the first planned segment start.
    Late,
    /// Last punch before the last planned segment end.
    EarlyDeparture,
    /// Arrival punch far outside the planned window.
    OutOfWindowIn,
    /// Departure punch far outside the planned window.
    OutOfWindowOut,
    /// Dangling departure with no matching arrival.
    MissingIn,
    /// Dangling arrival with no matching departure.
    MissingOut,
    /// Punches on a day with no planned shift.
    UnplannedPresence,
    /// Overtime under the auto-validation ceiling.
    OvertimeAuto,
    /// Overtime above the ceiling, needs explicit approval.
    OvertimeApproval,
    /// Punches on a day covered by approved leave.
    AbsenceWithPunch,
    /// Planned shift, no punches, no approved leave.
    UnexcusedAbsence,
}

/// Severity tiers, ordered from least to most serious.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Info,
    Attention,
    Critical,
    NeedsApproval,
    OutOfWindow,
}

/// Review state. Records are never deleted; a superseding reconciliation
/// pass moves still-pending rows to `obsolete` instead.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyStatus {
    Pending,
    Validated,
    Refused,
    Corrected,
    Obsolete,
}

/// One detected deviation for one employee on one date, with its review
/// state and structured detection details (deviation minutes, expected vs
/// actual times, hour totals).
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Anomaly {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "late")]
    pub kind: String,
    #[schema(example = "attention")]
    pub severity: String,
    #[schema(example = "Arrived 15 min after planned start 09:00")]
    pub description: String,
    #[schema(value_type = Object)]
    pub details: Json<serde_json::Value>,
    #[schema(example = "pending")]
    pub status: String,
    /// Employee-submitted justification, if any.
    pub justification: Option<String>,
    /// Reviewer's comment entered at treatment time.
    pub reviewer_comment: Option<String>,
    /// Linked leave record for the absence-with-punch case.
    pub leave_id: Option<u64>,
    /// Linked extra payment when overtime or missing hours were monetized.
    pub extra_payment_id: Option<u64>,
    /// Reconciliation pass that produced this record.
    #[schema(example = "8e5f0f3a-92d0-4f6e-9a3e-0f1d2c3b4a55")]
    pub run_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_round_trips_through_canonical_string() {
        for kind in [
            AnomalyKind::Late,
            AnomalyKind::OutOfWindowIn,
            AnomalyKind::MissingOut,
            AnomalyKind::OvertimeApproval,
            AnomalyKind::AbsenceWithPunch,
        ] {
            let s = kind.to_string();
            assert_eq!(AnomalyKind::from_str(&s).unwrap(), kind, "kind = {s}");
        }
        assert_eq!(AnomalyKind::Late.to_string(), "late");
        assert_eq!(AnomalyKind::OutOfWindowIn.to_string(), "out_of_window_in");
    }

    #[test]
    fn severity_tiers_are_ordered() {
        assert!(Severity::Info < Severity::Attention);
        assert!(Severity::Attention < Severity::Critical);
        assert!(Severity::Critical < Severity::NeedsApproval);
    }

    #[test]
    fn status_round_trips() {
        for status in [
            AnomalyStatus::Pending,
            AnomalyStatus::Validated,
            AnomalyStatus::Refused,
            AnomalyStatus::Corrected,
            AnomalyStatus::Obsolete,
        ] {
            let s = status.to_string();
            assert_eq!(AnomalyStatus::from_str(&s).unwrap(), status);
        }
    }
}
