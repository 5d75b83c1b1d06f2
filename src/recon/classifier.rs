//! Deviation classifier.
//!
//! Pure rules over one employee-day: a planned shift (if any), the day's
//! normalized punches, and whether approved leave covers the date. Output is
//! zero or more detected anomalies; a single day can yield several (late
//! arrival AND early departure) and they are all recorded, never merged.

use chrono::NaiveDate;
use serde_json::json;

use crate::config::ReconThresholds;
use crate::model::anomaly::{AnomalyKind, Severity};
use crate::model::punch::PunchKind;
use crate::model::shift::{Segment, ShiftKind};
use crate::recon::error::ReconError;
use crate::recon::hours::{minutes_to_hours, parse_hhmm, planned_minutes, MINUTES_PER_DAY};
use crate::recon::pairing::{pair_punches, PunchEvent};

/// The planned side of one employee-day.
#[derive(Debug, Clone)]
pub struct ShiftDay {
    pub shift_id: u64,
    pub kind: ShiftKind,
    pub segments: Vec<Segment>,
}

/// Everything the classifier needs for one employee-day.
#[derive(Debug, Clone)]
pub struct DayRecord {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub shift: Option<ShiftDay>,
    /// Sorted chronologically.
    pub punches: Vec<PunchEvent>,
    pub on_approved_leave: bool,
}

/// One detected deviation, not yet persisted.
#[derive(Debug, Clone)]
pub struct Detected {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub description: String,
    pub details: serde_json::Value,
}

fn fmt_minutes(minutes: i32) -> String {
    let m = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Fold a raw minute delta back into a plausible range. A punch at 00:30
/// against a 23:00 start otherwise reads as "-22.5 hours late".
fn wrap_delta(delta: i32) -> i32 {
    if delta > MINUTES_PER_DAY / 2 {
        delta - MINUTES_PER_DAY
    } else if delta < -MINUTES_PER_DAY / 2 {
        delta + MINUTES_PER_DAY
    } else {
        delta
    }
}

/// Run the classification rules for one employee-day, in precedence order.
pub fn classify_day(
    day: &DayRecord,
    thresholds: &ReconThresholds,
) -> Result<Vec<Detected>, ReconError> {
    let mut detected = Vec::new();

    // Rule 1: approved leave with punches is a conflict between two signals.
    if day.on_approved_leave {
        if !day.punches.is_empty() {
            detected.push(Detected {
                kind: AnomalyKind::AbsenceWithPunch,
                severity: Severity::Critical,
                description: "Punches recorded on a day covered by approved leave".to_string(),
                details: json!({ "punch_count": day.punches.len() }),
            });
        }
        // Approved leave with no punches is a justified absence, not an anomaly.
        return Ok(detected);
    }

    let planned = day
        .shift
        .as_ref()
        .filter(|s| s.kind == ShiftKind::Presence);

    let Some(shift) = planned else {
        // Rule 6: presence without a plan. May be a legitimate last-minute
        // fill-in, so severity stays low.
        if !day.punches.is_empty() {
            let pairing = pair_punches(&day.punches);
            detected.push(Detected {
                kind: AnomalyKind::UnplannedPresence,
                severity: Severity::Info,
                description: "Punches recorded with no planned shift".to_string(),
                details: json!({
                    "punch_count": day.punches.len(),
                    "realized_hours": pairing.worked_hours(),
                }),
            });
            push_dangling(&mut detected, &pairing.dangling);
        }
        return Ok(detected);
    };

    // Rule 2: planned, unpunched, and no approved leave.
    if day.punches.is_empty() {
        let totals = planned_minutes(&shift.segments)?;
        detected.push(Detected {
            kind: AnomalyKind::UnexcusedAbsence,
            severity: Severity::Critical,
            description: "Planned shift with no punches and no approved leave".to_string(),
            details: json!({ "planned_hours": totals.official_hours() }),
        });
        return Ok(detected);
    }

    let pairing = pair_punches(&day.punches);
    let totals = planned_minutes(&shift.segments)?;

    // Rule 3: lateness against the first segment's start. Only a real
    // arrival counts; a day opening on a dangling departure is an
    // incomplete-pointage condition, not a late one.
    let first_arrival = day.punches.first().filter(|p| p.kind == PunchKind::In);
    if let (Some(first_segment), Some(first_punch)) = (shift.segments.first(), first_arrival) {
        let expected = parse_hhmm(&first_segment.start)?;
        let delta = wrap_delta(first_punch.minutes - expected);
        let detail = |d: i32| {
            json!({
                "deviation_minutes": d,
                "expected": fmt_minutes(expected),
                "actual": fmt_minutes(first_punch.minutes),
            })
        };

        if delta < -thresholds.out_of_window_min {
            detected.push(Detected {
                kind: AnomalyKind::OutOfWindowIn,
                severity: Severity::OutOfWindow,
                description: format!(
                    "Arrival punch {} is {} min before planned start {}",
                    fmt_minutes(first_punch.minutes),
                    -delta,
                    fmt_minutes(expected)
                ),
                details: detail(delta),
            });
        } else if delta > thresholds.late_grace_min {
            let severity = if delta <= thresholds.late_attention_max_min {
                Severity::Attention
            } else {
                Severity::Critical
            };
            detected.push(Detected {
                kind: AnomalyKind::Late,
                severity,
                description: format!(
                    "Arrived {} min after planned start {}",
                    delta,
                    fmt_minutes(expected)
                ),
                details: detail(delta),
            });
        }
    }

    // Rule 4: early departure against the last segment's end, symmetric to
    // rule 3: a trailing dangling arrival never reads as a departure.
    let last_departure = day.punches.last().filter(|p| p.kind == PunchKind::Out);
    if let (Some(last_segment), Some(last_punch)) = (shift.segments.last(), last_departure) {
        let expected = parse_hhmm(&last_segment.end)?;
        let delta = wrap_delta(expected - last_punch.minutes);
        let detail = |d: i32| {
            json!({
                "deviation_minutes": d,
                "expected": fmt_minutes(expected),
                "actual": fmt_minutes(last_punch.minutes),
            })
        };

        if delta < -thresholds.out_of_window_min {
            detected.push(Detected {
                kind: AnomalyKind::OutOfWindowOut,
                severity: Severity::OutOfWindow,
                description: format!(
                    "Departure punch {} is {} min after planned end {}",
                    fmt_minutes(last_punch.minutes),
                    -delta,
                    fmt_minutes(expected)
                ),
                details: detail(delta),
            });
        } else if delta > thresholds.depart_grace_min {
            let severity = if delta <= thresholds.depart_attention_max_min {
                Severity::Attention
            } else {
                Severity::Critical
            };
            detected.push(Detected {
                kind: AnomalyKind::EarlyDeparture,
                severity,
                description: format!(
                    "Left {} min before planned end {}",
                    delta,
                    fmt_minutes(expected)
                ),
                details: detail(delta),
            });
        }
    }

    // Rule 5: overtime against official (non-extra) planned minutes.
    let excess = pairing.worked_minutes - totals.official;
    if excess > thresholds.overtime_tolerance_min {
        let (kind, severity) = if excess <= thresholds.overtime_auto_ceiling_min {
            (AnomalyKind::OvertimeAuto, Severity::Info)
        } else {
            (AnomalyKind::OvertimeApproval, Severity::NeedsApproval)
        };
        detected.push(Detected {
            kind,
            severity,
            description: format!(
                "Worked {} h against {} h planned ({} min excess)",
                pairing.worked_hours(),
                totals.official_hours(),
                excess
            ),
            details: json!({
                "excess_minutes": excess,
                "planned_hours": totals.official_hours(),
                "realized_hours": pairing.worked_hours(),
                "overtime_hours": minutes_to_hours(excess),
            }),
        });
    }

    // Rule 7: an odd punch count is surfaced, never silently truncated.
    push_dangling(&mut detected, &pairing.dangling);

    Ok(detected)
}

fn push_dangling(detected: &mut Vec<Detected>, dangling: &Option<PunchKind>) {
    if let Some(kind) = dangling {
        let (anomaly_kind, description) = match kind {
            PunchKind::In => (
                AnomalyKind::MissingOut,
                "Odd punch count: arrival without matching departure",
            ),
            PunchKind::Out => (
                AnomalyKind::MissingIn,
                "Odd punch count: departure without matching arrival",
            ),
        };
        detected.push(Detected {
            kind: anomaly_kind,
            severity: Severity::Attention,
            description: description.to_string(),
            details: json!({ "dangling": kind.to_string() }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ReconThresholds {
        ReconThresholds::default()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn ev(h: i32, m: i32, kind: PunchKind) -> PunchEvent {
        PunchEvent::new(h * 60 + m, kind)
    }

    fn presence_shift(segments: Vec<Segment>) -> Option<ShiftDay> {
        Some(ShiftDay {
            shift_id: 1,
            kind: ShiftKind::Presence,
            segments,
        })
    }

    fn split_day_shift() -> Option<ShiftDay> {
        presence_shift(vec![
            Segment::new("09:00", "13:00"),
            Segment::new("14:00", "18:00"),
        ])
    }

    fn day(
        shift: Option<ShiftDay>,
        punches: Vec<PunchEvent>,
        on_approved_leave: bool,
    ) -> DayRecord {
        DayRecord {
            employee_id: 1001,
            date: date(),
            shift,
            punches,
            on_approved_leave,
        }
    }

    #[test]
    fn fifteen_minute_lateness_is_exactly_one_attention_anomaly() {
        // Spec scenario: planned 09:00-13:00 / 14:00-18:00, punches
        // 09:15in 13:00out 14:00in 18:00out.
        let d = day(
            split_day_shift(),
            vec![
                ev(9, 15, PunchKind::In),
                ev(13, 0, PunchKind::Out),
                ev(14, 0, PunchKind::In),
                ev(18, 0, PunchKind::Out),
            ],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, AnomalyKind::Late);
        assert_eq!(detected[0].severity, Severity::Attention);
        assert_eq!(detected[0].details["deviation_minutes"], 15);
        assert_eq!(detected[0].details["expected"], "09:00");
        assert_eq!(detected[0].details["actual"], "09:15");
    }

    #[test]
    fn lateness_within_grace_is_clean() {
        let d = day(
            split_day_shift(),
            vec![
                ev(9, 5, PunchKind::In),
                ev(13, 0, PunchKind::Out),
                ev(14, 0, PunchKind::In),
                ev(18, 0, PunchKind::Out),
            ],
            false,
        );
        assert!(classify_day(&d, &thresholds()).unwrap().is_empty());
    }

    #[test]
    fn lateness_severity_is_monotonic_in_the_delay() {
        let t = thresholds();
        let mut last_rank = 0u8;
        for delay in [0, 3, 5, 6, 15, 30, 31, 45] {
            let d = day(
                split_day_shift(),
                vec![ev(9, delay, PunchKind::In), ev(18, 0, PunchKind::Out)],
                false,
            );
            let detected = classify_day(&d, &t).unwrap();
            let rank = detected
                .iter()
                .find(|a| a.kind == AnomalyKind::Late)
                .map(|a| match a.severity {
                    Severity::Attention => 1,
                    Severity::Critical => 2,
                    _ => 3,
                })
                .unwrap_or(0);
            assert!(rank >= last_rank, "severity dropped at delay {delay}");
            last_rank = rank;
        }
    }

    #[test]
    fn very_early_punch_against_late_shift_wraps_instead_of_reading_as_negative_hours() {
        // Shift starts 23:00; punch at 00:30 is 90 min late, not -22.5 h.
        let d = day(
            presence_shift(vec![Segment::new("23:00", "03:00")]),
            vec![ev(0, 30, PunchKind::In), ev(3, 0, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        let late = detected
            .iter()
            .find(|a| a.kind == AnomalyKind::Late)
            .expect("late anomaly");
        assert_eq!(late.details["deviation_minutes"], 90);
        assert_eq!(late.severity, Severity::Critical);
    }

    #[test]
    fn arrival_long_before_window_is_out_of_window() {
        let d = day(
            split_day_shift(),
            vec![ev(7, 0, PunchKind::In), ev(18, 0, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(detected.iter().any(|a| a.kind == AnomalyKind::OutOfWindowIn));
    }

    #[test]
    fn early_departure_bands_mirror_lateness() {
        let d = day(
            split_day_shift(),
            vec![
                ev(9, 0, PunchKind::In),
                ev(13, 0, PunchKind::Out),
                ev(14, 0, PunchKind::In),
                ev(17, 40, PunchKind::Out),
            ],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, AnomalyKind::EarlyDeparture);
        assert_eq!(detected[0].severity, Severity::Attention);
        assert_eq!(detected[0].details["deviation_minutes"], 20);
    }

    #[test]
    fn departure_long_after_window_is_out_of_window() {
        let d = day(
            split_day_shift(),
            vec![ev(9, 0, PunchKind::In), ev(19, 0, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(detected.iter().any(|a| a.kind == AnomalyKind::OutOfWindowOut));
    }

    #[test]
    fn late_arrival_and_early_departure_both_emitted() {
        let d = day(
            split_day_shift(),
            vec![ev(9, 20, PunchKind::In), ev(17, 30, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        let kinds: Vec<_> = detected.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AnomalyKind::Late));
        assert!(kinds.contains(&AnomalyKind::EarlyDeparture));
    }

    #[test]
    fn approved_leave_with_no_punches_is_justified_not_an_anomaly() {
        let d = day(
            presence_shift(vec![Segment::new("09:00", "18:00")]),
            vec![],
            true,
        );
        assert!(classify_day(&d, &thresholds()).unwrap().is_empty());
    }

    #[test]
    fn approved_leave_with_punches_is_a_critical_conflict() {
        let d = day(
            presence_shift(vec![Segment::new("09:00", "18:00")]),
            vec![ev(9, 0, PunchKind::In), ev(12, 0, PunchKind::Out)],
            true,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, AnomalyKind::AbsenceWithPunch);
        assert_eq!(detected[0].severity, Severity::Critical);
    }

    #[test]
    fn planned_unpunched_day_without_leave_is_unexcused() {
        let d = day(presence_shift(vec![Segment::new("09:00", "18:00")]), vec![], false);
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, AnomalyKind::UnexcusedAbsence);
    }

    #[test]
    fn punches_with_no_shift_are_unplanned_presence() {
        let d = day(None, vec![ev(11, 0, PunchKind::In), ev(15, 0, PunchKind::Out)], false);
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, AnomalyKind::UnplannedPresence);
        assert_eq!(detected[0].severity, Severity::Info);
        assert_eq!(detected[0].details["realized_hours"], 4.0);
    }

    #[test]
    fn dangling_arrival_emits_missing_out_never_silence() {
        let d = day(
            split_day_shift(),
            vec![
                ev(9, 0, PunchKind::In),
                ev(13, 0, PunchKind::Out),
                ev(14, 0, PunchKind::In),
            ],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(detected.iter().any(|a| a.kind == AnomalyKind::MissingOut));
        // The trailing 14:00 arrival must not double as a departure.
        assert!(
            !detected.iter().any(|a| matches!(
                a.kind,
                AnomalyKind::EarlyDeparture | AnomalyKind::OutOfWindowOut
            )),
            "fabricated departure anomaly: {detected:?}"
        );
    }

    #[test]
    fn dangling_departure_emits_missing_in() {
        let d = day(split_day_shift(), vec![ev(18, 0, PunchKind::Out)], false);
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(detected.iter().any(|a| a.kind == AnomalyKind::MissingIn));
        // A lone departure is not an arrival; no lateness may be derived.
        assert!(
            !detected.iter().any(|a| matches!(
                a.kind,
                AnomalyKind::Late | AnomalyKind::OutOfWindowIn
            )),
            "fabricated arrival anomaly: {detected:?}"
        );
    }

    #[test]
    fn small_overtime_auto_qualifies() {
        let d = day(
            presence_shift(vec![Segment::new("09:00", "17:00")]),
            vec![ev(9, 0, PunchKind::In), ev(17, 30, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        let overtime = detected
            .iter()
            .find(|a| a.kind == AnomalyKind::OvertimeAuto)
            .expect("auto overtime");
        assert_eq!(overtime.details["excess_minutes"], 30);
        assert_eq!(overtime.details["overtime_hours"], 0.5);
    }

    #[test]
    fn large_overtime_needs_approval() {
        let d = day(
            presence_shift(vec![Segment::new("09:00", "17:00")]),
            vec![ev(9, 0, PunchKind::In), ev(19, 0, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        let overtime = detected
            .iter()
            .find(|a| a.kind == AnomalyKind::OvertimeApproval)
            .expect("approval overtime");
        assert_eq!(overtime.severity, Severity::NeedsApproval);
    }

    #[test]
    fn extra_segments_do_not_count_toward_overtime_baseline_planned() {
        // 8h regular + 2h extra planned; working 10h is overtime against the
        // official 8h only if excess passes tolerance -- it is 120 min here.
        let d = day(
            presence_shift(vec![
                Segment::new("09:00", "17:00"),
                Segment::extra("17:00", "19:00"),
            ]),
            vec![ev(9, 0, PunchKind::In), ev(19, 0, PunchKind::Out)],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(detected.iter().any(|a| a.kind == AnomalyKind::OvertimeApproval));
    }

    #[test]
    fn spec_scenario_no_overtime_when_realized_under_planned() {
        // 7.75h realized vs 8.0h planned: no overtime anomaly.
        let d = day(
            split_day_shift(),
            vec![
                ev(9, 15, PunchKind::In),
                ev(13, 0, PunchKind::Out),
                ev(14, 0, PunchKind::In),
                ev(18, 0, PunchKind::Out),
            ],
            false,
        );
        let detected = classify_day(&d, &thresholds()).unwrap();
        assert!(!detected
            .iter()
            .any(|a| matches!(a.kind, AnomalyKind::OvertimeAuto | AnomalyKind::OvertimeApproval)));
    }

    #[test]
    fn malformed_segment_time_is_a_validation_error() {
        let d = day(
            presence_shift(vec![Segment::new("9h00", "18:00")]),
            vec![ev(9, 0, PunchKind::In), ev(18, 0, PunchKind::Out)],
            false,
        );
        assert!(classify_day(&d, &thresholds()).is_err());
    }
}
