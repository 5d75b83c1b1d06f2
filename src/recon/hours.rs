//! Segment hour arithmetic.
//!
//! Planned segments carry local clock strings; everything here works in
//! minutes since midnight and converts to decimal hours only at the edges.

use crate::model::shift::Segment;
use crate::recon::error::ReconError;

pub const MINUTES_PER_DAY: i32 = 1440;

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Result<i32, ReconError> {
    let bad = || ReconError::BadTime(value.to_string());
    let (h, m) = value.trim().split_once(':').ok_or_else(bad)?;
    let h: i32 = h.parse().map_err(|_| bad())?;
    let m: i32 = m.parse().map_err(|_| bad())?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return Err(bad());
    }
    Ok(h * 60 + m)
}

/// Duration of one segment in minutes, with overnight wraparound. A segment
/// ending before it starts crosses midnight; `start == end` is zero minutes,
/// never a full day.
pub fn segment_minutes(segment: &Segment) -> Result<i32, ReconError> {
    let start = parse_hhmm(&segment.start)?;
    let end = parse_hhmm(&segment.end)?;
    if end >= start {
        Ok(end - start)
    } else {
        Ok(end + MINUTES_PER_DAY - start)
    }
}

/// Planned totals for one shift, split between official and extra work.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannedMinutes {
    /// Minutes from regular segments; feeds reports and deviation math.
    pub official: i32,
    /// Minutes from `is_extra` segments; feeds the extra-payment path only.
    pub extra: i32,
}

impl PlannedMinutes {
    pub fn official_hours(&self) -> f64 {
        minutes_to_hours(self.official)
    }

    pub fn extra_hours(&self) -> f64 {
        minutes_to_hours(self.extra)
    }
}

/// Sum a shift's segments into official and extra minute totals.
pub fn planned_minutes(segments: &[Segment]) -> Result<PlannedMinutes, ReconError> {
    let mut totals = PlannedMinutes::default();
    for segment in segments {
        let minutes = segment_minutes(segment)?;
        if segment.is_extra {
            totals.extra += minutes;
        } else {
            totals.official += minutes;
        }
    }
    Ok(totals)
}

/// Minutes → decimal hours rounded to 2 places.
pub fn minutes_to_hours(minutes: i32) -> f64 {
    ((minutes as f64 / 60.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_times() {
        assert_eq!(parse_hhmm("09:00").unwrap(), 540);
        assert_eq!(parse_hhmm("00:00").unwrap(), 0);
        assert_eq!(parse_hhmm("23:59").unwrap(), 1439);
        assert_eq!(parse_hhmm(" 17:30 ").unwrap(), 1050);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["24:00", "12:60", "12", "ab:cd", "", "12:3x", "-1:00"] {
            assert!(parse_hhmm(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn same_day_segment_duration() {
        let seg = Segment::new("09:00", "13:00");
        assert_eq!(segment_minutes(&seg).unwrap(), 240);
    }

    #[test]
    fn overnight_segment_wraps_instead_of_going_negative() {
        // 22:00 -> 02:00 is four hours of night work.
        let seg = Segment::new("22:00", "02:00");
        assert_eq!(segment_minutes(&seg).unwrap(), 240);
        let seg = Segment::new("17:00", "01:00");
        assert_eq!(minutes_to_hours(segment_minutes(&seg).unwrap()), 8.0);
    }

    #[test]
    fn zero_duration_segment_is_zero_not_a_full_day() {
        let seg = Segment::new("09:00", "09:00");
        assert_eq!(segment_minutes(&seg).unwrap(), 0);
    }

    #[test]
    fn extra_segments_are_split_out_of_official_totals() {
        let segments = vec![
            Segment::new("09:00", "13:00"),
            Segment::new("14:00", "18:00"),
            Segment::extra("18:00", "20:00"),
        ];
        let totals = planned_minutes(&segments).unwrap();
        assert_eq!(totals.official, 480);
        assert_eq!(totals.extra, 120);
        assert_eq!(totals.official_hours(), 8.0);
        assert_eq!(totals.extra_hours(), 2.0);
    }

    #[test]
    fn hours_round_to_two_decimals() {
        assert_eq!(minutes_to_hours(465), 7.75);
        assert_eq!(minutes_to_hours(50), 0.83);
    }
}
