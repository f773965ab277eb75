//! Core types for the jobpulse aggregation pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw rows, normalized records, aggregate tables, and the dense
//! timeline consumed by the scene views.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DashboardError;

/// Canonical `YYYY-MM` grouping key for all three aggregate tables.
///
/// Ordering is chronological and identical to the lexicographic order of the
/// string form. Construction validates the month, so every held value names a
/// representable calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Create a key from a year and a 1-based month.
    ///
    /// Returns `None` for months outside 1-12 or years outside 1-9999.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Key of the calendar month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month, the representative date for time axes.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("month key holds a representable calendar month")
    }

    /// The following calendar month, rolling over year boundaries
    /// (2024-12 -> 2025-01).
    pub fn next_month(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Display label in the `Mon YYYY` form used on chart axes.
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DashboardError::InvalidMonthKey(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = DashboardError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Raw row exactly as decoded from the source table: field name -> string.
///
/// No invariants; rows may be malformed. Field decoding from bytes is the
/// loader's job, not ours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub HashMap<String, String>);

impl RawRecord {
    /// Look up a field, treating whitespace-only values as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Builder-style field setter, mainly for tests and fixtures.
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }
}

/// Typed record produced by the normalizer.
///
/// Numeric fields keep their missing-ness as `Option`; whether a missing
/// value counts as zero is decided at aggregation time by
/// [`MissingValuePolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Date the posting was published.
    pub posting_date: NaiveDate,
    /// Annual salary in USD, if present and parseable.
    pub salary_usd: Option<f64>,
    /// Required years of experience, if present and parseable.
    pub years_experience: Option<f64>,
    /// Benefits score, if present and parseable.
    pub benefits_score: Option<f64>,
    /// Job title as written in the source row.
    pub job_title: String,
}

impl NormalizedRecord {
    /// Month key this record aggregates under.
    pub fn month_key(&self) -> MonthKey {
        MonthKey::from_date(self.posting_date)
    }
}

/// How missing numeric fields participate in averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Missing values contribute 0 to the sum and the record still counts in
    /// the denominator, so `avg == total / count`. This is the legacy
    /// behavior and silently pulls averages toward zero.
    #[default]
    TreatAsZero,
    /// Missing values are excluded from both the sum and the denominator of
    /// the affected field. A field with no samples averages to 0.
    ExcludeFromAverage,
}

/// Per-month posting statistics.
///
/// Totals are the raw accumulated sums; averages are derived once, after the
/// full record pass. Entries only exist for months with at least one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    /// Number of postings in the month.
    pub count: u32,
    pub total_salary: f64,
    pub total_experience: f64,
    pub total_benefits: f64,
    pub avg_salary: f64,
    pub avg_experience: f64,
    pub avg_benefits: f64,
}

/// Per-month salary series entry.
///
/// A projection of the monthly statistics restricted to salary, kept as its
/// own table because the time-series view needs a representative date rather
/// than a raw key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryStats {
    /// First day of the month, for time axes.
    pub date: NaiveDate,
    pub count: u32,
    pub total_salary: f64,
    pub avg_salary: f64,
}

/// Job-title counts for one month. Unordered; consumers sort and truncate at
/// read time.
pub type TitleCounts = HashMap<String, u32>;

/// The three derived aggregate tables, built fresh on every dataset load and
/// immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTables {
    /// Month key -> posting statistics.
    pub monthly: HashMap<MonthKey, MonthlyStats>,
    /// Month key -> salary series entry.
    pub salary: HashMap<MonthKey, SalaryStats>,
    /// Month key -> job title -> count.
    pub titles: HashMap<MonthKey, TitleCounts>,
    /// Rows dropped because their posting date was unparseable.
    pub skipped_records: u32,
}

impl AggregateTables {
    /// True when no record contributed to any table.
    pub fn is_empty(&self) -> bool {
        self.monthly.is_empty()
    }

    /// Month keys with data, in chronological order.
    pub fn sorted_month_keys(&self) -> Vec<MonthKey> {
        let mut keys: Vec<MonthKey> = self.monthly.keys().copied().collect();
        keys.sort();
        keys
    }
}

/// One point of the dense, gap-filled timeline.
///
/// Months absent from the source aggregate carry count 0 and zero averages,
/// so downstream scale computation never needs null handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub key: MonthKey,
    /// First day of the month.
    pub date: NaiveDate,
    /// `Mon YYYY` axis label.
    pub label: String,
    pub count: u32,
    pub avg_salary: f64,
    pub avg_experience: f64,
    pub avg_benefits: f64,
}

/// Dense timeline over a fixed window, with peak/trough annotations.
///
/// The point sequence covers every month of the window exactly once, in
/// order. `peak` and `trough` index the strictly maximal and minimal counts;
/// on ties the earlier month wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub points: Vec<TimelinePoint>,
    pub peak: usize,
    pub trough: usize,
}

impl Timeline {
    pub fn peak_point(&self) -> &TimelinePoint {
        &self.points[self.peak]
    }

    pub fn trough_point(&self) -> &TimelinePoint {
        &self.points[self.trough]
    }

    /// Maximum posting count across the window.
    pub fn max_count(&self) -> u32 {
        self.points[self.peak].count
    }

    /// Maximum average salary across the full dense sequence, for y-scale
    /// domains.
    pub fn max_avg_salary(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.avg_salary)
            .fold(0.0, f64::max)
    }
}

/// One ranked job title with its posting count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCount {
    pub title: String,
    pub count: u32,
}

/// Result of the top-titles read for a selected month.
///
/// `NoData` and `NoSelection` are explicit result variants, not errors: a
/// renderer must be able to tell "valid month, nothing posted" from "no
/// month chosen yet" and from an empty dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TitleRanking {
    /// Titles sorted by descending count, ties alphabetical, truncated to
    /// the configured top-N.
    Ranked {
        key: MonthKey,
        titles: Vec<TitleCount>,
    },
    /// The selected month is inside the window but has no title entries.
    NoData { key: MonthKey },
    /// No month has been selected yet.
    NoSelection,
}

/// Postings-over-time view (scene 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingsView {
    pub timeline: Timeline,
}

/// Salary trend view (scene 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryTrendView {
    pub timeline: Timeline,
}

impl SalaryTrendView {
    /// Points the line generator should connect: months with a positive
    /// average salary. The full dense sequence stays available for the
    /// scale domain.
    pub fn line_points(&self) -> Vec<&TimelinePoint> {
        self.timeline
            .points
            .iter()
            .filter(|p| p.avg_salary > 0.0)
            .collect()
    }

    /// Y-scale domain maximum over the full dense sequence.
    pub fn y_domain_max(&self) -> f64 {
        self.timeline.max_avg_salary()
    }
}

/// A fully computed scene view, ready for the render adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scene")]
pub enum SceneView {
    Postings(PostingsView),
    SalaryTrend(SalaryTrendView),
    TopTitles(TitleRanking),
}
