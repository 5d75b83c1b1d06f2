//! Batch reconciliation pass.
//!
//! Loads planned shifts, punches and approved leave for a date range,
//! shards the work per employee (their data never interact), classifies
//! each employee-day and persists the results. Re-scanning a day first
//! moves its still-pending anomalies to `obsolete` so a changed shift never
//! leaves stale pending records behind.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use futures::future::join_all;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::MySqlPool;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::ReconThresholds;
use crate::model::anomaly::{AnomalyKind, AnomalyStatus};
use crate::model::punch::PunchKind;
use crate::model::shift::{Segment, ShiftKind};
use crate::recon::classifier::{classify_day, DayRecord, ShiftDay};
use crate::recon::leave_index::{LeaveIndex, LeaveSpan};
use crate::recon::pairing::PunchEvent;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ReconOutcome {
    #[schema(example = "8e5f0f3a-92d0-4f6e-9a3e-0f1d2c3b4a55")]
    pub run_id: String,
    #[schema(example = 12)]
    pub employees: u64,
    #[schema(example = 84)]
    pub days_scanned: u64,
    #[schema(example = 7)]
    pub anomalies_created: u64,
    #[schema(example = 2)]
    pub anomalies_obsoleted: u64,
    /// Days skipped because stored data failed validation (logged, never silent).
    #[schema(example = 0)]
    pub days_skipped: u64,
}

#[derive(sqlx::FromRow)]
struct ShiftRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    kind: String,
    segments: Json<Vec<Segment>>,
}

#[derive(sqlx::FromRow)]
struct PunchRow {
    employee_id: u64,
    date: NaiveDate,
    time: NaiveTime,
    kind: String,
}

#[derive(sqlx::FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: Option<String>,
}

/// Day records grouped per employee, plus which approved leave covers each
/// employee-day (for linking absence-with-punch anomalies back to the leave).
pub struct LoadedDays {
    pub by_employee: HashMap<u64, Vec<DayRecord>>,
    pub leave_ids: HashMap<(u64, NaiveDate), u64>,
}

/// Load everything the classifier and the report aggregates need for a
/// window, optionally restricted to one employee.
pub async fn load_day_records(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
    employee_id: Option<u64>,
) -> Result<LoadedDays> {
    let shifts = sqlx::query_as::<_, ShiftRow>(
        r#"
        SELECT id, employee_id, date, kind, segments
        FROM shifts
        WHERE date BETWEEN ? AND ?
        AND (? IS NULL OR employee_id = ?)
        ORDER BY employee_id, date
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(pool)
    .await
    .context("failed to load shifts")?;

    let punches = sqlx::query_as::<_, PunchRow>(
        r#"
        SELECT employee_id, date, time, kind
        FROM punches
        WHERE date BETWEEN ? AND ?
        AND (? IS NULL OR employee_id = ?)
        ORDER BY employee_id, date, time
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(pool)
    .await
    .context("failed to load punches")?;

    let leaves = sqlx::query_as::<_, LeaveRow>(
        r#"
        SELECT id, employee_id, start_date, end_date, status
        FROM leaves
        WHERE status = 'approved'
        AND start_date <= ? AND end_date >= ?
        AND (? IS NULL OR employee_id = ?)
        "#,
    )
    .bind(end)
    .bind(start)
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(pool)
    .await
    .context("failed to load approved leaves")?;

    let spans: Vec<LeaveSpan> = leaves
        .iter()
        .filter_map(|row| {
            let status = crate::model::leave::LeaveStatus::from_str(row.status.as_deref()?).ok()?;
            Some(LeaveSpan {
                employee_id: row.employee_id,
                start_date: row.start_date,
                end_date: row.end_date,
                status,
            })
        })
        .collect();
    let leave_index = LeaveIndex::build(&spans, start, end);

    let mut leave_ids = HashMap::new();
    for row in &leaves {
        let mut day = row.start_date.max(start);
        let to = row.end_date.min(end);
        while day <= to {
            leave_ids.entry((row.employee_id, day)).or_insert(row.id);
            day += chrono::Duration::days(1);
        }
    }

    fn day_entry<'a>(
        days: &'a mut HashMap<u64, BTreeMap<NaiveDate, DayRecord>>,
        leave_index: &LeaveIndex,
        employee_id: u64,
        date: NaiveDate,
    ) -> &'a mut DayRecord {
        days.entry(employee_id)
            .or_default()
            .entry(date)
            .or_insert_with(|| DayRecord {
                employee_id,
                date,
                shift: None,
                punches: Vec::new(),
                on_approved_leave: leave_index.covers(employee_id, date),
            })
    }

    let mut days: HashMap<u64, BTreeMap<NaiveDate, DayRecord>> = HashMap::new();

    for row in shifts {
        let Some(kind) = ShiftKind::parse(&row.kind) else {
            tracing::warn!(shift_id = row.id, kind = %row.kind, "Unknown shift kind, skipping");
            continue;
        };
        day_entry(&mut days, &leave_index, row.employee_id, row.date).shift = Some(ShiftDay {
            shift_id: row.id,
            kind,
            segments: row.segments.0,
        });
    }

    for row in punches {
        let Some(kind) = PunchKind::normalize(&row.kind) else {
            tracing::warn!(
                employee_id = row.employee_id,
                kind = %row.kind,
                "Unknown punch kind, skipping"
            );
            continue;
        };
        let minutes = (row.time.hour() * 60 + row.time.minute()) as i32;
        day_entry(&mut days, &leave_index, row.employee_id, row.date)
            .punches
            .push(PunchEvent::new(minutes, kind));
    }

    let by_employee = days
        .into_iter()
        .map(|(employee_id, by_date)| (employee_id, by_date.into_values().collect()))
        .collect();

    Ok(LoadedDays {
        by_employee,
        leave_ids,
    })
}

/// Run one reconciliation pass. Employees are processed concurrently; each
/// employee's writes are independent rows so shards never contend.
pub async fn run_reconciliation(
    pool: &MySqlPool,
    thresholds: &ReconThresholds,
    start: NaiveDate,
    end: NaiveDate,
    employee_id: Option<u64>,
) -> Result<ReconOutcome> {
    let run_id = Uuid::new_v4().to_string();
    let loaded = load_day_records(pool, start, end, employee_id).await?;

    tracing::info!(
        run_id = %run_id,
        employees = loaded.by_employee.len(),
        %start,
        %end,
        "Reconciliation pass starting"
    );

    let mut outcome = ReconOutcome {
        run_id: run_id.clone(),
        employees: loaded.by_employee.len() as u64,
        ..Default::default()
    };

    let leave_ids = &loaded.leave_ids;
    let tasks = loaded.by_employee.values().map(|employee_days| {
        reconcile_employee(pool, thresholds, &run_id, employee_days, leave_ids)
    });

    for shard in join_all(tasks).await {
        let shard = shard?;
        outcome.days_scanned += shard.days_scanned;
        outcome.anomalies_created += shard.anomalies_created;
        outcome.anomalies_obsoleted += shard.anomalies_obsoleted;
        outcome.days_skipped += shard.days_skipped;
    }

    tracing::info!(
        run_id = %run_id,
        created = outcome.anomalies_created,
        obsoleted = outcome.anomalies_obsoleted,
        skipped = outcome.days_skipped,
        "Reconciliation pass finished"
    );

    Ok(outcome)
}

#[derive(Default)]
struct ShardOutcome {
    days_scanned: u64,
    anomalies_created: u64,
    anomalies_obsoleted: u64,
    days_skipped: u64,
}

async fn reconcile_employee(
    pool: &MySqlPool,
    thresholds: &ReconThresholds,
    run_id: &str,
    days: &[DayRecord],
    leave_ids: &HashMap<(u64, NaiveDate), u64>,
) -> Result<ShardOutcome> {
    let mut shard = ShardOutcome::default();

    for day in days {
        let detected = match classify_day(day, thresholds) {
            Ok(detected) => detected,
            Err(e) => {
                tracing::warn!(
                    employee_id = day.employee_id,
                    date = %day.date,
                    error = %e,
                    "Skipping day with invalid stored data"
                );
                shard.days_skipped += 1;
                continue;
            }
        };
        shard.days_scanned += 1;

        // A rescan supersedes whatever is still awaiting review for the day,
        // whether or not the fresh set is empty. Obsoleting and re-inserting
        // commit together: a failure mid-day must not leave the day with its
        // pending rows retired and nothing fresh in their place.
        let mut tx = pool
            .begin()
            .await
            .context("failed to open day transaction")?;

        let obsoleted = sqlx::query(
            r#"
            UPDATE anomalies
            SET status = ?, updated_at = NOW()
            WHERE employee_id = ? AND date = ? AND status = ?
            "#,
        )
        .bind(AnomalyStatus::Obsolete.to_string())
        .bind(day.employee_id)
        .bind(day.date)
        .bind(AnomalyStatus::Pending.to_string())
        .execute(&mut *tx)
        .await
        .context("failed to obsolete superseded anomalies")?;

        let mut created = 0;
        for anomaly in detected {
            let leave_id = if anomaly.kind == AnomalyKind::AbsenceWithPunch {
                leave_ids.get(&(day.employee_id, day.date)).copied()
            } else {
                None
            };
            sqlx::query(
                r#"
                INSERT INTO anomalies
                    (employee_id, date, kind, severity, description, details,
                     status, leave_id, run_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(day.employee_id)
            .bind(day.date)
            .bind(anomaly.kind.to_string())
            .bind(anomaly.severity.to_string())
            .bind(&anomaly.description)
            .bind(Json(&anomaly.details))
            .bind(AnomalyStatus::Pending.to_string())
            .bind(leave_id)
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .context("failed to insert anomaly")?;
            created += 1;
        }

        tx.commit()
            .await
            .context("failed to commit day persistence")?;
        shard.anomalies_obsoleted += obsoleted.rows_affected();
        shard.anomalies_created += created;
    }

    Ok(shard)
}
