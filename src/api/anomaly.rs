use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::model::anomaly::{Anomaly, AnomalyKind, AnomalyStatus};
use crate::model::shift::Segment;
use crate::recon::lifecycle::{
    apply_correction, decide, parse_request, TreatAction, TreatRequest,
};

#[derive(serde::Deserialize, IntoParams, ToSchema)]
pub struct AnomalyFilter {
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = "late")]
    pub kind: Option<String>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AnomalyListResponse {
    pub data: Vec<Anomaly>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

/// Outcome of a treat action, echoed back to the reviewer UI.
#[derive(Serialize, ToSchema)]
pub struct TreatResponse {
    pub anomaly: Anomaly,
    /// True only for corriger.
    pub shift_mutated: bool,
    /// Punctuality score adjustment applied to the employee.
    #[schema(example = -2)]
    pub score_delta: i32,
    /// True when the refusal streak reached the escalation threshold.
    pub escalated: bool,
}

enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
}

#[derive(sqlx::FromRow)]
struct AnomalyHead {
    employee_id: u64,
    date: NaiveDate,
    kind: String,
    details: Json<serde_json::Value>,
}

#[derive(sqlx::FromRow)]
struct ShiftHead {
    id: u64,
    segments: Json<Vec<Segment>>,
}

const ANOMALY_COLUMNS: &str = r#"
    id, employee_id, date, kind, severity, description, details, status,
    justification, reviewer_comment, leave_id, extra_payment_id, run_id,
    created_at, updated_at
"#;

async fn fetch_anomaly(pool: &MySqlPool, id: u64) -> Result<Option<Anomaly>, sqlx::Error> {
    sqlx::query_as::<_, Anomaly>(&format!(
        "SELECT {ANOMALY_COLUMNS} FROM anomalies WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get one anomaly
#[utoipa::path(
    get,
    path = "/api/v1/anomaly/{id}",
    params(("id" = u64, Path, description = "Anomaly ID")),
    responses(
        (status = 200, description = "Anomaly found", body = Anomaly),
        (status = 404, description = "Anomaly not found")
    ),
    tag = "Anomaly"
)]
pub async fn get_anomaly(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let anomaly = fetch_anomaly(pool.get_ref(), id).await.map_err(|e| {
        error!(error = %e, id, "Failed to fetch anomaly");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match anomaly {
        Some(a) => Ok(HttpResponse::Ok().json(a)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Anomaly not found"
        }))),
    }
}

/// List anomalies
#[utoipa::path(
    get,
    path = "/api/v1/anomaly",
    params(AnomalyFilter),
    responses(
        (status = 200, description = "Paginated anomaly list", body = AnomalyListResponse)
    ),
    tag = "Anomaly"
)]
pub async fn list_anomalies(
    pool: web::Data<MySqlPool>,
    query: web::Query<AnomalyFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(20).clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);
    let offset = crate::api::page_offset(page, per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(kind) = query.kind.as_deref() {
        where_sql.push_str(" AND kind = ?");
        args.push(FilterValue::Str(kind));
    }
    if let Some(start) = query.start_date {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(start));
    }
    if let Some(end) = query.end_date {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(end));
    }

    let count_sql = format!("SELECT COUNT(*) FROM anomalies{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count anomalies");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        "SELECT {ANOMALY_COLUMNS} FROM anomalies{} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Anomaly>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }
    let anomalies = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch anomaly list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AnomalyListResponse {
        data: anomalies,
        page,
        per_page,
        total,
    }))
}

/// Hours a validated anomaly monetizes. `None` means the pay flag was set
/// on a kind whose details carry nothing to price; the caller must reject
/// the request rather than drop the flag.
fn payable_hours(
    kind: &str,
    details: &serde_json::Value,
    pay_missing_hours: bool,
) -> Option<f64> {
    let parsed: Option<AnomalyKind> = kind.parse().ok();
    if matches!(
        parsed,
        Some(AnomalyKind::OvertimeAuto) | Some(AnomalyKind::OvertimeApproval)
    ) {
        return Some(
            details
                .get("overtime_hours")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
        );
    }
    if !pay_missing_hours {
        return Some(0.0);
    }
    if let Some(minutes) = details.get("deviation_minutes").and_then(|v| v.as_i64()) {
        let hours = minutes.abs() as f64 / 60.0;
        return Some((hours * 100.0).round() / 100.0);
    }
    // Unexcused absence details price a whole planned day.
    if let Some(planned) = details.get("planned_hours").and_then(|v| v.as_f64()) {
        return Some(planned);
    }
    None
}

/// Treat an anomaly (valider / refuser / corriger)
#[utoipa::path(
    post,
    path = "/api/v1/anomaly/{id}/treat",
    params(("id" = u64, Path, description = "Anomaly ID")),
    request_body = TreatRequest,
    responses(
        (status = 200, description = "Anomaly treated", body = TreatResponse),
        (status = 400, description = "Invalid request", body = Object, example = json!({
            "message": "a non-empty comment is required to refuse an anomaly"
        })),
        (status = 404, description = "Anomaly not found"),
        (status = 409, description = "Anomaly is no longer pending", body = Object, example = json!({
            "message": "Anomaly already treated"
        }))
    ),
    tag = "Anomaly"
)]
pub async fn treat_anomaly(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<TreatRequest>,
) -> actix_web::Result<impl Responder> {
    let anomaly_id = path.into_inner();

    let action = match parse_request(payload.into_inner()) {
        Ok(action) => action,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };
    let decision = decide(&action);

    let head = sqlx::query_as::<_, AnomalyHead>(
        "SELECT employee_id, date, kind, details FROM anomalies WHERE id = ?",
    )
    .bind(anomaly_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, anomaly_id, "Failed to fetch anomaly");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(head) = head else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Anomaly not found"
        })));
    };

    let payable = match &action {
        TreatAction::Validate {
            pay_missing_hours, ..
        } => match payable_hours(&head.kind, &head.details.0, *pay_missing_hours) {
            Some(hours) => hours,
            None => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": format!(
                        "pay_missing_hours is not applicable to a '{}' anomaly",
                        head.kind
                    )
                })));
            }
        },
        _ => 0.0,
    };

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, anomaly_id, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let reviewer_comment = match &action {
        TreatAction::Validate { comment, .. } => comment.clone(),
        TreatAction::Refuse { comment } => Some(comment.clone()),
        TreatAction::Correct { justification, .. } => Some(justification.clone()),
    };

    // Compare-and-swap on status: two reviewers racing on the same pending
    // anomaly cannot both win this update.
    let transitioned = sqlx::query(
        r#"
        UPDATE anomalies
        SET status = ?, reviewer_comment = ?, updated_at = NOW()
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(decision.new_status.to_string())
    .bind(&reviewer_comment)
    .bind(anomaly_id)
    .bind(AnomalyStatus::Pending.to_string())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, anomaly_id, "Failed to transition anomaly");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if transitioned.rows_affected() == 0 {
        return Ok(HttpResponse::Conflict().json(serde_json::json!({
            "message": "Anomaly already treated"
        })));
    }

    let mut shift_mutated = false;
    if let TreatAction::Correct { justification, correction } = &action {
        let shift = sqlx::query_as::<_, ShiftHead>(
            "SELECT id, segments FROM shifts WHERE employee_id = ? AND date = ? LIMIT 1",
        )
        .bind(head.employee_id)
        .bind(head.date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to fetch shift for correction");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        let Some(shift) = shift else {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "No shift exists for this anomaly's day, nothing to correct"
            })));
        };

        let corrected = match apply_correction(&shift.segments.0, correction) {
            Ok(corrected) => corrected,
            Err(e) => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": e.to_string()
                })));
            }
        };

        // Prior segments go to the audit table before the overwrite; the
        // original plan stays recoverable.
        sqlx::query(
            r#"
            INSERT INTO shift_audits (shift_id, anomaly_id, segments_before, reason)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(shift.id)
        .bind(anomaly_id)
        .bind(Json(&shift.segments.0))
        .bind(justification)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to write shift audit");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        sqlx::query("UPDATE shifts SET segments = ?, updated_at = NOW() WHERE id = ?")
            .bind(Json(&corrected))
            .bind(shift.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, anomaly_id, "Failed to rewrite shift segments");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
        shift_mutated = true;
    }

    let refusal_sql = if decision.counts_refusal {
        r#"
        UPDATE employees
        SET punctuality_score = punctuality_score + ?,
            consecutive_refusals = consecutive_refusals + 1
        WHERE id = ?
        "#
    } else {
        r#"
        UPDATE employees
        SET punctuality_score = punctuality_score + ?,
            consecutive_refusals = 0
        WHERE id = ?
        "#
    };
    sqlx::query(refusal_sql)
        .bind(decision.score_delta)
        .bind(head.employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to adjust punctuality score");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let mut escalated = false;
    if decision.counts_refusal {
        let refusals = sqlx::query_scalar::<_, i32>(
            "SELECT consecutive_refusals FROM employees WHERE id = ?",
        )
        .bind(head.employee_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to read refusal streak");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        if refusals >= config.thresholds.refusal_escalation_threshold {
            escalated = true;
            warn!(
                employee_id = head.employee_id,
                refusals, "Consecutive refusal threshold reached, HR escalation"
            );
        }
    }

    if matches!(action, TreatAction::Validate { .. }) && payable > 0.0 {
        let inserted = sqlx::query(
            r#"
            INSERT INTO extra_payments (employee_id, date, hours, anomaly_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(head.employee_id)
        .bind(head.date)
        .bind(payable)
        .bind(anomaly_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to create extra payment");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        sqlx::query("UPDATE anomalies SET extra_payment_id = ? WHERE id = ?")
            .bind(inserted.last_insert_id())
            .bind(anomaly_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, anomaly_id, "Failed to link extra payment");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, anomaly_id, "Failed to commit treatment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let anomaly = fetch_anomaly(pool.get_ref(), anomaly_id)
        .await
        .map_err(|e| {
            error!(error = %e, anomaly_id, "Failed to reload anomaly");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(TreatResponse {
        anomaly,
        shift_mutated,
        score_delta: decision.score_delta,
        escalated,
    }))
}

#[cfg(test)]
mod tests {
    use super::payable_hours;
    use serde_json::json;

    #[test]
    fn overtime_kinds_price_their_overtime_hours_regardless_of_the_flag() {
        let details = json!({ "overtime_hours": 0.5, "excess_minutes": 30 });
        assert_eq!(payable_hours("overtime_auto", &details, false), Some(0.5));
        assert_eq!(payable_hours("overtime_approval", &details, true), Some(0.5));
    }

    #[test]
    fn deviation_kinds_price_their_deviation_when_the_flag_is_set() {
        let details = json!({ "deviation_minutes": 15, "expected": "09:00", "actual": "09:15" });
        assert_eq!(payable_hours("late", &details, true), Some(0.25));
        assert_eq!(payable_hours("early_departure", &details, true), Some(0.25));
        assert_eq!(payable_hours("late", &details, false), Some(0.0));
    }

    #[test]
    fn unexcused_absence_prices_the_full_planned_day() {
        let details = json!({ "planned_hours": 8.0 });
        assert_eq!(payable_hours("unexcused_absence", &details, true), Some(8.0));
        assert_eq!(payable_hours("unexcused_absence", &details, false), Some(0.0));
    }

    #[test]
    fn pay_flag_on_an_unpriceable_kind_is_refused_not_dropped() {
        let details = json!({ "dangling": "in" });
        assert_eq!(payable_hours("missing_out", &details, true), None);
        assert_eq!(payable_hours("missing_in", &details, true), None);
        // Without the flag there is nothing to pay and nothing to refuse.
        assert_eq!(payable_hours("missing_out", &details, false), Some(0.0));
    }
}
