use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::model::punch::{Punch, PunchKind};

#[derive(Deserialize, ToSchema)]
pub struct CreatePunch {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "09:15:00", value_type = String)]
    pub time: NaiveTime,
    /// Raw direction as emitted by the badge system; normalized on ingest.
    #[schema(example = "arrivée")]
    pub kind: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PunchFilter {
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 50)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PunchListResponse {
    pub data: Vec<Punch>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 4)]
    pub total: i64,
}

enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

/// Ingest a punch event
#[utoipa::path(
    post,
    path = "/api/v1/punch",
    request_body = CreatePunch,
    responses(
        (status = 200, description = "Punch recorded", body = Object, example = json!({
            "message": "Punch recorded",
            "kind": "in"
        })),
        (status = 400, description = "Unknown punch kind", body = Object, example = json!({
            "message": "Unknown punch kind 'lunch'"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Punch"
)]
pub async fn create_punch(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePunch>,
) -> actix_web::Result<impl Responder> {
    // Legacy encodings (arrivée / ENTRÉE / in...) are folded into the enum
    // here, at the storage boundary; nothing downstream sees raw strings.
    let Some(kind) = PunchKind::normalize(&payload.kind) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Unknown punch kind '{}'", payload.kind)
        })));
    };

    sqlx::query(
        r#"
        INSERT INTO punches (employee_id, date, time, kind, raw_kind)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.date)
    .bind(payload.time)
    .bind(kind.to_string())
    .bind(&payload.kind)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, "Failed to record punch");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Punch recorded",
        "kind": kind.to_string(),
    })))
}

/// List punches
#[utoipa::path(
    get,
    path = "/api/v1/punch",
    params(PunchFilter),
    responses(
        (status = 200, description = "Paginated punch list", body = PunchListResponse)
    ),
    tag = "Punch"
)]
pub async fn list_punches(
    pool: web::Data<MySqlPool>,
    query: web::Query<PunchFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(50).clamp(1, 500);
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

    let count_sql = format!("SELECT COUNT(*) FROM punches{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count punches");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, date, time, kind, raw_kind, created_at
        FROM punches
        {}
        ORDER BY date DESC, time DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Punch>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }
    let punches = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch punch list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PunchListResponse {
        data: punches,
        page,
        per_page,
        total,
    }))
}
