//! Approved-leave date index.
//!
//! Expands leave records over a query range into a set keyed by
//! (employee, date) so the classifier can test coverage in O(1). Only
//! records whose status is `approved` make it into the index; pending or
//! rejected requests must never suppress absence detection.

use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

use crate::model::leave::LeaveStatus;

/// A leave row reduced to what the index needs.
#[derive(Debug, Clone)]
pub struct LeaveSpan {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
}

#[derive(Debug, Default)]
pub struct LeaveIndex {
    covered: HashSet<(u64, NaiveDate)>,
}

impl LeaveIndex {
    /// Build the index for one query window. Leave days outside the window
    /// are not materialized.
    pub fn build(spans: &[LeaveSpan], window_start: NaiveDate, window_end: NaiveDate) -> Self {
        let mut covered = HashSet::new();
        for span in spans {
            if span.status != LeaveStatus::Approved {
                continue;
            }
            let from = span.start_date.max(window_start);
            let to = span.end_date.min(window_end);
            let mut day = from;
            while day <= to {
                covered.insert((span.employee_id, day));
                day += Duration::days(1);
            }
        }
        Self { covered }
    }

    pub fn covers(&self, employee_id: u64, date: NaiveDate) -> bool {
        self.covered.contains(&(employee_id, date))
    }

    pub fn len(&self) -> usize {
        self.covered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn approved_leave_covers_every_day_in_its_range() {
        let spans = vec![LeaveSpan {
            employee_id: 1001,
            start_date: d(5),
            end_date: d(7),
            status: LeaveStatus::Approved,
        }];
        let index = LeaveIndex::build(&spans, d(1), d(31));
        assert!(index.covers(1001, d(5)));
        assert!(index.covers(1001, d(6)));
        assert!(index.covers(1001, d(7)));
        assert!(!index.covers(1001, d(4)));
        assert!(!index.covers(1001, d(8)));
        assert!(!index.covers(1002, d(6)));
    }

    #[test]
    fn pending_leave_never_suppresses_absence_detection() {
        let spans = vec![LeaveSpan {
            employee_id: 1001,
            start_date: d(5),
            end_date: d(7),
            status: LeaveStatus::Pending,
        }];
        let index = LeaveIndex::build(&spans, d(1), d(31));
        assert!(index.is_empty());
    }

    #[test]
    fn leave_clipped_to_query_window() {
        let spans = vec![LeaveSpan {
            employee_id: 1001,
            start_date: d(1),
            end_date: d(31),
            status: LeaveStatus::Approved,
        }];
        let index = LeaveIndex::build(&spans, d(10), d(12));
        assert_eq!(index.len(), 3);
        assert!(index.covers(1001, d(10)));
        assert!(!index.covers(1001, d(9)));
    }
}
