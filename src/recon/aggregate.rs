//! Per-employee reporting totals.
//!
//! Downstream report exports expect hour totals already net of extra
//! segments; extra hours ride in their own column toward the separate
//! payment path.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::ReconThresholds;
use crate::model::shift::ShiftKind;
use crate::recon::classifier::DayRecord;
use crate::recon::error::ReconError;
use crate::recon::hours::{minutes_to_hours, planned_minutes};
use crate::recon::pairing::pair_punches;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct EmployeeTotals {
    #[schema(example = 1001)]
    pub employee_id: u64,
    /// Planned hours from regular segments only.
    #[schema(example = 160.0)]
    pub planned_hours: f64,
    /// Planned hours from `is_extra` segments.
    #[schema(example = 6.0)]
    pub extra_hours: f64,
    /// Hours covered by complete punch pairs.
    #[schema(example = 152.25)]
    pub realized_hours: f64,
    /// Realized excess over plan, past the overtime tolerance.
    #[schema(example = 2.5)]
    pub overtime_hours: f64,
    /// Planned days with no punches, covered by approved leave.
    #[schema(example = 3)]
    pub justified_absence_days: u32,
    /// Planned days with no punches and no approved leave.
    #[schema(example = 1)]
    pub unexcused_absence_days: u32,
    /// Days whose punch count was odd.
    #[schema(example = 1)]
    pub incomplete_days: u32,
}

/// Fold one employee's day records into reporting totals.
pub fn summarize(
    employee_id: u64,
    days: &[DayRecord],
    thresholds: &ReconThresholds,
) -> Result<EmployeeTotals, ReconError> {
    let mut planned = 0;
    let mut extra = 0;
    let mut realized = 0;
    let mut overtime = 0;
    let mut totals = EmployeeTotals {
        employee_id,
        ..Default::default()
    };

    for day in days {
        let shift = day
            .shift
            .as_ref()
            .filter(|s| s.kind == ShiftKind::Presence);

        let official = match shift {
            Some(shift) => {
                let day_planned = planned_minutes(&shift.segments)?;
                planned += day_planned.official;
                extra += day_planned.extra;
                Some(day_planned.official)
            }
            None => None,
        };

        if day.punches.is_empty() {
            if official.is_some() {
                if day.on_approved_leave {
                    totals.justified_absence_days += 1;
                } else {
                    totals.unexcused_absence_days += 1;
                }
            }
            continue;
        }

        let pairing = pair_punches(&day.punches);
        realized += pairing.worked_minutes;
        if pairing.dangling.is_some() {
            totals.incomplete_days += 1;
        }
        if let Some(official) = official {
            let excess = pairing.worked_minutes - official;
            if excess > thresholds.overtime_tolerance_min {
                overtime += excess;
            }
        }
    }

    totals.planned_hours = minutes_to_hours(planned);
    totals.extra_hours = minutes_to_hours(extra);
    totals.realized_hours = minutes_to_hours(realized);
    totals.overtime_hours = minutes_to_hours(overtime);
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::punch::PunchKind;
    use crate::model::shift::Segment;
    use crate::recon::classifier::ShiftDay;
    use crate::recon::pairing::PunchEvent;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn ev(h: i32, m: i32, kind: PunchKind) -> PunchEvent {
        PunchEvent::new(h * 60 + m, kind)
    }

    fn shift(segments: Vec<Segment>) -> Option<ShiftDay> {
        Some(ShiftDay {
            shift_id: 1,
            kind: ShiftKind::Presence,
            segments,
        })
    }

    fn record(
        day: u32,
        s: Option<ShiftDay>,
        punches: Vec<PunchEvent>,
        on_leave: bool,
    ) -> DayRecord {
        DayRecord {
            employee_id: 1001,
            date: d(day),
            shift: s,
            punches,
            on_approved_leave: on_leave,
        }
    }

    #[test]
    fn unpunched_day_with_approved_conge_counts_as_justified_absence() {
        let days = vec![record(
            5,
            shift(vec![Segment::new("09:00", "18:00")]),
            vec![],
            true,
        )];
        let totals = summarize(1001, &days, &ReconThresholds::default()).unwrap();
        assert_eq!(totals.justified_absence_days, 1);
        assert_eq!(totals.unexcused_absence_days, 0);
        assert_eq!(totals.planned_hours, 9.0);
        assert_eq!(totals.realized_hours, 0.0);
    }

    #[test]
    fn extra_segments_stay_out_of_official_planned_hours() {
        let days = vec![record(
            5,
            shift(vec![
                Segment::new("09:00", "17:00"),
                Segment::extra("17:00", "19:00"),
            ]),
            vec![ev(9, 0, PunchKind::In), ev(17, 0, PunchKind::Out)],
            false,
        )];
        let totals = summarize(1001, &days, &ReconThresholds::default()).unwrap();
        assert_eq!(totals.planned_hours, 8.0);
        assert_eq!(totals.extra_hours, 2.0);
        assert_eq!(totals.realized_hours, 8.0);
        assert_eq!(totals.overtime_hours, 0.0);
    }

    #[test]
    fn week_of_mixed_days_adds_up() {
        let split = || {
            shift(vec![
                Segment::new("09:00", "13:00"),
                Segment::new("14:00", "18:00"),
            ])
        };
        let days = vec![
            // worked as planned
            record(
                5,
                split(),
                vec![
                    ev(9, 0, PunchKind::In),
                    ev(13, 0, PunchKind::Out),
                    ev(14, 0, PunchKind::In),
                    ev(18, 0, PunchKind::Out),
                ],
                false,
            ),
            // late, short day
            record(
                6,
                split(),
                vec![
                    ev(9, 15, PunchKind::In),
                    ev(13, 0, PunchKind::Out),
                    ev(14, 0, PunchKind::In),
                    ev(18, 0, PunchKind::Out),
                ],
                false,
            ),
            // unexcused absence
            record(7, split(), vec![], false),
            // incomplete punches
            record(
                8,
                split(),
                vec![ev(9, 0, PunchKind::In), ev(13, 0, PunchKind::Out), ev(14, 0, PunchKind::In)],
                false,
            ),
            // stayed 1h over
            record(
                9,
                shift(vec![Segment::new("09:00", "17:00")]),
                vec![ev(9, 0, PunchKind::In), ev(18, 0, PunchKind::Out)],
                false,
            ),
        ];
        let totals = summarize(1001, &days, &ReconThresholds::default()).unwrap();
        assert_eq!(totals.planned_hours, 40.0);
        assert_eq!(totals.realized_hours, 8.0 + 7.75 + 4.0 + 9.0);
        assert_eq!(totals.unexcused_absence_days, 1);
        assert_eq!(totals.incomplete_days, 1);
        assert_eq!(totals.overtime_hours, 1.0);
    }
}
