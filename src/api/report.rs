use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::recon::aggregate::{summarize, EmployeeTotals};
use crate::recon::engine::load_day_records;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    /// Restrict to one employee; omitted means all employees in range.
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub data: Vec<EmployeeSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeSummary {
    #[serde(flatten)]
    pub totals: EmployeeTotals,
    /// Anomaly counts by kind over the range.
    #[schema(example = json!({"late": 2, "missing_out": 1}))]
    pub anomalies: HashMap<String, i64>,
}

#[derive(sqlx::FromRow)]
struct KindCount {
    employee_id: u64,
    kind: String,
    n: i64,
}

/// Per-employee reporting totals
///
/// Hour totals are already net of extra segments, as the export
/// collaborators expect.
#[utoipa::path(
    get,
    path = "/api/v1/report/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Per-employee totals", body = SummaryResponse),
        (status = 400, description = "Invalid date range")
    ),
    tag = "Report"
)]
pub async fn summary(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    if query.start_date > query.end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let loaded = load_day_records(
        pool.get_ref(),
        query.start_date,
        query.end_date,
        query.employee_id,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to load day records for summary");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Reviewed-or-pending anomaly counts; obsolete rows are history, not news.
    let counts = sqlx::query_as::<_, KindCount>(
        r#"
        SELECT employee_id, kind, COUNT(*) AS n
        FROM anomalies
        WHERE date BETWEEN ? AND ?
        AND status <> 'obsolete'
        AND (? IS NULL OR employee_id = ?)
        GROUP BY employee_id, kind
        "#,
    )
    .bind(query.start_date)
    .bind(query.end_date)
    .bind(query.employee_id)
    .bind(query.employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count anomalies for summary");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut counts_by_employee: HashMap<u64, HashMap<String, i64>> = HashMap::new();
    for row in counts {
        counts_by_employee
            .entry(row.employee_id)
            .or_default()
            .insert(row.kind, row.n);
    }

    let mut data = Vec::with_capacity(loaded.by_employee.len());
    for (employee_id, days) in &loaded.by_employee {
        let totals = summarize(*employee_id, days, &config.thresholds).map_err(|e| {
            error!(error = %e, employee_id, "Failed to summarize employee days");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
        data.push(EmployeeSummary {
            totals,
            anomalies: counts_by_employee.remove(employee_id).unwrap_or_default(),
        });
    }
    data.sort_by_key(|s| s.totals.employee_id);

    Ok(HttpResponse::Ok().json(SummaryResponse { data }))
}
