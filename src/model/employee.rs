use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1001,
        "employee_code": "EMP-001",
        "first_name": "Marie",
        "last_name": "Dupont",
        "punctuality_score": 12,
        "consecutive_refusals": 0,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1001)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Marie")]
    pub first_name: String,

    #[schema(example = "Dupont")]
    pub last_name: String,

    /// Running punctuality score, adjusted by anomaly review decisions.
    #[schema(example = 12)]
    pub punctuality_score: i32,

    /// Consecutive refused anomalies; reset by a validate or correct.
    #[schema(example = 0)]
    pub consecutive_refusals: i32,

    #[schema(example = "active")]
    pub status: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
