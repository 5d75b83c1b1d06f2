use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::model::shift::{Segment, Shift, ShiftKind};
use crate::recon::hours::{planned_minutes, segment_minutes};

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "presence")]
    pub kind: ShiftKind,
    pub segments: Vec<Segment>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ShiftFilter {
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ShiftListResponse {
    pub data: Vec<Shift>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Typed SQLx binding for dynamic filters
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

fn validate_segments(kind: ShiftKind, segments: &[Segment]) -> Result<(), String> {
    if kind == ShiftKind::Presence && segments.is_empty() {
        return Err("a presence shift requires at least one segment".to_string());
    }
    for segment in segments {
        if let Err(e) = segment_minutes(segment) {
            return Err(e.to_string());
        }
    }
    Ok(())
}

/// Create a planned shift
#[utoipa::path(
    post,
    path = "/api/v1/shift",
    request_body = CreateShift,
    responses(
        (status = 200, description = "Shift created", body = Object, example = json!({
            "message": "Shift created",
            "planned_hours": 8.0,
            "extra_hours": 0.0
        })),
        (status = 400, description = "Invalid segments"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shift"
)]
pub async fn create_shift(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    if let Err(reason) = validate_segments(payload.kind, &payload.segments) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": reason
        })));
    }

    // Safe after validation.
    let totals = planned_minutes(&payload.segments).map_err(|e| {
        error!(error = %e, "Segment totals failed after validation");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query(
        r#"
        INSERT INTO shifts (employee_id, date, kind, segments)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.date)
    .bind(payload.kind.to_string())
    .bind(Json(&payload.segments))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, "Failed to create shift");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Shift created",
        "planned_hours": totals.official_hours(),
        "extra_hours": totals.extra_hours(),
    })))
}

/// Get one shift
#[utoipa::path(
    get,
    path = "/api/v1/shift/{id}",
    params(("id" = u64, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift found", body = Shift),
        (status = 404, description = "Shift not found")
    ),
    tag = "Shift"
)]
pub async fn get_shift(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let shift = sqlx::query_as::<_, Shift>(
        r#"
        SELECT id, employee_id, date, kind, segments, created_at, updated_at
        FROM shifts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to fetch shift");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match shift {
        Some(s) => Ok(HttpResponse::Ok().json(s)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Shift not found"
        }))),
    }
}

/// List shifts
#[utoipa::path(
    get,
    path = "/api/v1/shift",
    params(ShiftFilter),
    responses(
        (status = 200, description = "Paginated shift list", body = ShiftListResponse)
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    pool: web::Data<MySqlPool>,
    query: web::Query<ShiftFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = crate::api::page_offset(page, per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }
    if let Some(start) = query.start_date {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(start));
    }
    if let Some(end) = query.end_date {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(end));
    }

    let count_sql = format!("SELECT COUNT(*) FROM shifts{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count shifts");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, date, kind, segments, created_at, updated_at
        FROM shifts
        {}
        ORDER BY date DESC, employee_id
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Shift>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }
    let shifts = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch shift list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ShiftListResponse {
        data: shifts,
        page,
        per_page,
        total,
    }))
}
