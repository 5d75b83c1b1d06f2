use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::config::Config;
use crate::recon::engine::{run_reconciliation, ReconOutcome};

#[derive(Deserialize, ToSchema)]
pub struct RunReconciliation {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    /// Restrict the pass to one employee.
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
}

/// Run a reconciliation pass
#[utoipa::path(
    post,
    path = "/api/v1/recon/run",
    request_body = RunReconciliation,
    responses(
        (status = 200, description = "Pass completed", body = ReconOutcome),
        (status = 400, description = "Invalid date range"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reconciliation"
)]
pub async fn run(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<RunReconciliation>,
) -> actix_web::Result<impl Responder> {
    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let outcome: ReconOutcome = run_reconciliation(
        pool.get_ref(),
        &config.thresholds,
        payload.start_date,
        payload.end_date,
        payload.employee_id,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Reconciliation pass failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(outcome))
}
