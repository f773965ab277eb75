//! Timeline materialization
//!
//! This module expands a sparse month-keyed aggregate into a dense, ordered
//! sequence spanning a fixed calendar window. Months with no data get
//! zero-valued points, so chart scales never special-case missing months.
//! Peak and trough annotations are computed here as well.

use std::collections::HashMap;

use crate::error::DashboardError;
use crate::types::{MonthKey, MonthlyStats, SalaryStats, Timeline, TimelinePoint};

/// Inclusive calendar-month window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MonthWindow {
    start: MonthKey,
    end: MonthKey,
}

impl MonthWindow {
    /// Create a window. Errors when `start` is after `end`; a single-month
    /// window is valid.
    pub fn new(start: MonthKey, end: MonthKey) -> Result<Self, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> MonthKey {
        self.start
    }

    pub fn end(&self) -> MonthKey {
        self.end
    }

    /// Number of months in the window, both ends included. Always >= 1.
    pub fn months(&self) -> usize {
        let span = (self.end.year() - self.start.year()) * 12 + self.end.month() as i32
            - self.start.month() as i32;
        span as usize + 1
    }

    pub fn contains(&self, key: MonthKey) -> bool {
        self.start <= key && key <= self.end
    }

    /// Iterate the window month by month, rolling over year boundaries.
    pub fn iter(&self) -> impl Iterator<Item = MonthKey> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |key| {
            if *key < end {
                Some(key.next_month())
            } else {
                None
            }
        })
    }
}

/// The per-month values a timeline source can report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimelineSample {
    pub count: u32,
    pub avg_salary: f64,
    pub avg_experience: f64,
    pub avg_benefits: f64,
}

/// A month-keyed aggregate the materializer can read.
///
/// Implemented by both the monthly-statistics and salary tables; the
/// materializer itself never knows which one it is densifying.
pub trait TimelineSource {
    fn sample(&self, key: &MonthKey) -> Option<TimelineSample>;
}

impl TimelineSource for HashMap<MonthKey, MonthlyStats> {
    fn sample(&self, key: &MonthKey) -> Option<TimelineSample> {
        self.get(key).map(|stats| TimelineSample {
            count: stats.count,
            avg_salary: stats.avg_salary,
            avg_experience: stats.avg_experience,
            avg_benefits: stats.avg_benefits,
        })
    }
}

impl TimelineSource for HashMap<MonthKey, SalaryStats> {
    fn sample(&self, key: &MonthKey) -> Option<TimelineSample> {
        self.get(key).map(|stats| TimelineSample {
            count: stats.count,
            avg_salary: stats.avg_salary,
            ..TimelineSample::default()
        })
    }
}

/// Expand `source` over the window into a dense timeline.
///
/// Output length equals the window's month count exactly, strictly ordered,
/// no gaps or duplicates. Peak is the strictly maximal count and trough the
/// strictly minimal one; the earlier month wins ties, which keeps the
/// annotation placement reproducible across runs.
pub fn materialize<S: TimelineSource + ?Sized>(source: &S, window: &MonthWindow) -> Timeline {
    let mut points = Vec::with_capacity(window.months());
    for key in window.iter() {
        let sample = source.sample(&key).unwrap_or_default();
        points.push(TimelinePoint {
            key,
            date: key.first_day(),
            label: key.label(),
            count: sample.count,
            avg_salary: sample.avg_salary,
            avg_experience: sample.avg_experience,
            avg_benefits: sample.avg_benefits,
        });
    }

    let mut peak = 0;
    let mut trough = 0;
    for (i, point) in points.iter().enumerate().skip(1) {
        if point.count > points[peak].count {
            peak = i;
        }
        if point.count < points[trough].count {
            trough = i;
        }
    }

    Timeline {
        points,
        peak,
        trough,
    }
}
