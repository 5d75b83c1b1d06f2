//! Positional punch pairing.
//!
//! A day's punches, sorted chronologically, are consumed in strict pairs:
//! index 0 pairs with 1, 2 with 3, and so on. An odd trailing punch is never
//! silently dropped; it is reported back so the classifier can emit an
//! incomplete-punch anomaly, keeping realized hours from under-reporting
//! without a record of why.

use crate::model::punch::PunchKind;
use crate::recon::hours::MINUTES_PER_DAY;

/// One normalized punch event positioned within a day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunchEvent {
    /// Minutes since midnight.
    pub minutes: i32,
    pub kind: PunchKind,
}

impl PunchEvent {
    pub fn new(minutes: i32, kind: PunchKind) -> Self {
        Self { minutes, kind }
    }
}

/// Result of pairing one employee-day's punches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pairing {
    /// Minutes covered by complete in/out pairs.
    pub worked_minutes: i32,
    pub pair_count: usize,
    /// The unpaired trailing punch, if the count was odd.
    pub dangling: Option<PunchKind>,
}

impl Pairing {
    pub fn worked_hours(&self) -> f64 {
        crate::recon::hours::minutes_to_hours(self.worked_minutes)
    }
}

/// Pair sorted punches positionally and sum worked minutes. A pair whose
/// departure reads earlier than its arrival crosses midnight and wraps.
pub fn pair_punches(punches: &[PunchEvent]) -> Pairing {
    let mut worked_minutes = 0;
    let mut pair_count = 0;

    let mut chunks = punches.chunks_exact(2);
    for pair in &mut chunks {
        let mut delta = pair[1].minutes - pair[0].minutes;
        if delta < 0 {
            delta += MINUTES_PER_DAY;
        }
        worked_minutes += delta;
        pair_count += 1;
    }

    let dangling = chunks.remainder().first().map(|p| p.kind);

    Pairing {
        worked_minutes,
        pair_count,
        dangling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(h: i32, m: i32, kind: PunchKind) -> PunchEvent {
        PunchEvent::new(h * 60 + m, kind)
    }

    #[test]
    fn even_list_sums_consecutive_pairs() {
        // 09:00in 13:00out 14:00in 18:00out -> 8h
        let punches = [
            ev(9, 0, PunchKind::In),
            ev(13, 0, PunchKind::Out),
            ev(14, 0, PunchKind::In),
            ev(18, 0, PunchKind::Out),
        ];
        let pairing = pair_punches(&punches);
        assert_eq!(pairing.worked_minutes, 480);
        assert_eq!(pairing.pair_count, 2);
        assert_eq!(pairing.dangling, None);
        assert_eq!(pairing.worked_hours(), 8.0);
    }

    #[test]
    fn odd_list_reports_the_dangling_punch() {
        let punches = [
            ev(9, 0, PunchKind::In),
            ev(13, 0, PunchKind::Out),
            ev(14, 0, PunchKind::In),
        ];
        let pairing = pair_punches(&punches);
        assert_eq!(pairing.worked_minutes, 240);
        assert_eq!(pairing.pair_count, 1);
        assert_eq!(pairing.dangling, Some(PunchKind::In));
    }

    #[test]
    fn single_departure_is_a_dangling_out() {
        let punches = [ev(18, 0, PunchKind::Out)];
        let pairing = pair_punches(&punches);
        assert_eq!(pairing.worked_minutes, 0);
        assert_eq!(pairing.dangling, Some(PunchKind::Out));
    }

    #[test]
    fn overnight_pair_wraps_past_midnight() {
        // 22:00in 02:00out -> 4h, not -20h
        let punches = [ev(22, 0, PunchKind::In), ev(2, 0, PunchKind::Out)];
        let pairing = pair_punches(&punches);
        assert_eq!(pairing.worked_minutes, 240);
    }

    #[test]
    fn empty_day_pairs_to_nothing() {
        let pairing = pair_punches(&[]);
        assert_eq!(pairing.worked_minutes, 0);
        assert_eq!(pairing.pair_count, 0);
        assert_eq!(pairing.dangling, None);
    }

    #[test]
    fn quarter_hours_round_cleanly() {
        // 09:15in 13:00out 14:00in 18:00out -> 7.75h
        let punches = [
            ev(9, 15, PunchKind::In),
            ev(13, 0, PunchKind::Out),
            ev(14, 0, PunchKind::In),
            ev(18, 0, PunchKind::Out),
        ];
        assert_eq!(pair_punches(&punches).worked_hours(), 7.75);
    }
}
