use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::str::FromStr;
use utoipa::ToSchema;

/// One contiguous planned working interval within a shift.
///
/// `start`/`end` are local clock strings (`"HH:MM"`); an `end` earlier than
/// `start` means the segment wraps past midnight. Segments flagged
/// `is_extra` are supplemental work excluded from official planned-hour
/// totals and paid through the extra-payment path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Segment {
    #[schema(example = "09:00")]
    pub start: String,
    #[schema(example = "13:00")]
    pub end: String,
    #[serde(default)]
    #[schema(example = false)]
    pub is_extra: bool,
}

impl Segment {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            is_extra: false,
        }
    }

    pub fn extra(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            is_extra: true,
        }
    }
}

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
pub enum ShiftKind {
    Presence,
    Absence,
}

impl ShiftKind {
    pub fn parse(value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

/// A planned work period for one employee on one calendar date.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "presence")]
    pub kind: String,
    #[schema(value_type = Vec<Segment>)]
    pub segments: Json<Vec<Segment>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}
