use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Normalized punch direction.
///
/// Source systems encode this inconsistently (`arrivée`, `ENTRÉE`, `in`, …);
/// normalization happens once at ingestion and only the enum is stored in
/// `punches.kind`. The classifier never sees raw strings.
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
pub enum PunchKind {
    In,
    Out,
}

impl PunchKind {
    /// Map any of the legacy encodings onto the canonical kind.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "in" | "entree" | "entrée" | "arrivee" | "arrivée" | "arrival" => Some(PunchKind::In),
            "out" | "sortie" | "depart" | "départ" | "departure" => Some(PunchKind::Out),
            other => Self::from_str(other).ok(),
        }
    }
}

/// One clock-in or clock-out event. Immutable once created; the badge
/// system owns these rows and the reconciler reads them only.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Punch {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "09:15:00", value_type = String)]
    pub time: NaiveTime,
    #[schema(example = "in")]
    pub kind: String,
    /// Original encoding as received from the badge system, kept for audit.
    #[schema(example = "arrivée")]
    pub raw_kind: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_legacy_arrival_encodings() {
        for raw in ["in", "IN", "arrivée", "ARRIVÉE", "ENTRÉE", "entree", " Arrival "] {
            assert_eq!(PunchKind::normalize(raw), Some(PunchKind::In), "raw = {raw}");
        }
    }

    #[test]
    fn normalize_accepts_legacy_departure_encodings() {
        for raw in ["out", "SORTIE", "départ", "depart", "Departure"] {
            assert_eq!(PunchKind::normalize(raw), Some(PunchKind::Out), "raw = {raw}");
        }
    }

    #[test]
    fn normalize_rejects_unknown_encoding() {
        assert_eq!(PunchKind::normalize("lunch"), None);
        assert_eq!(PunchKind::normalize(""), None);
    }

    #[test]
    fn canonical_string_forms() {
        assert_eq!(PunchKind::In.to_string(), "in");
        assert_eq!(PunchKind::Out.to_string(), "out");
    }
}
