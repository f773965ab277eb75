//! Record normalization
//!
//! This module converts raw string rows into typed records:
//! - Multi-format posting-date parsing
//! - Numeric fields kept as `Option` so missing-ness survives to aggregation
//! - Rows with unparseable dates are dropped (the caller counts them)

use chrono::NaiveDate;

use crate::types::{NormalizedRecord, RawRecord};

/// Source table column holding the posting date.
pub const FIELD_POSTING_DATE: &str = "posting_date";
/// Source table column holding the annual salary in USD.
pub const FIELD_SALARY_USD: &str = "salary_usd";
/// Source table column holding the required years of experience.
pub const FIELD_YEARS_EXPERIENCE: &str = "years_experience";
/// Source table column holding the benefits score.
pub const FIELD_BENEFITS_SCORE: &str = "benefits_score";
/// Source table column holding the job title.
pub const FIELD_JOB_TITLE: &str = "job_title";

/// Title substituted when the job-title column is absent or blank.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Normalizer for converting raw rows to typed records
pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Normalize a raw row. Pure; never fails.
    ///
    /// Returns `None` when the posting date is missing or unparseable, the
    /// one condition that excludes a row from every aggregate. Unparseable
    /// numeric fields become missing values, to be handled by the
    /// aggregation engine's missing-value policy.
    pub fn normalize(row: &RawRecord) -> Option<NormalizedRecord> {
        let posting_date = row.field(FIELD_POSTING_DATE).and_then(parse_date)?;

        Some(NormalizedRecord {
            posting_date,
            salary_usd: row.field(FIELD_SALARY_USD).and_then(parse_metric),
            years_experience: row.field(FIELD_YEARS_EXPERIENCE).and_then(parse_metric),
            benefits_score: row.field(FIELD_BENEFITS_SCORE).and_then(parse_metric),
            job_title: row
                .field(FIELD_JOB_TITLE)
                .unwrap_or(UNKNOWN_TITLE)
                .to_string(),
        })
    }
}

/// Parse a posting date, accepting `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`,
/// or the date part of an RFC 3339 timestamp. Returns `None` when parsing
/// fails.
fn parse_date(value: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // Timestamps like "2024-03-05T12:30:00Z": take the date prefix.
    if value.len() > 10 {
        if let Ok(date) = NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }
    None
}

/// Parse a non-negative numeric field. Non-numeric, non-finite, and negative
/// values all normalize to missing.
fn parse_metric(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_row() -> RawRecord {
        RawRecord::default()
            .with_field(FIELD_POSTING_DATE, "2024-03-05")
            .with_field(FIELD_SALARY_USD, "100000")
            .with_field(FIELD_YEARS_EXPERIENCE, "3.5")
            .with_field(FIELD_BENEFITS_SCORE, "7.2")
            .with_field(FIELD_JOB_TITLE, "ML Engineer")
    }

    #[test]
    fn normalizes_complete_row() {
        let record = RecordNormalizer::normalize(&sample_row()).unwrap();

        assert_eq!(
            record.posting_date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(record.salary_usd, Some(100000.0));
        assert_eq!(record.years_experience, Some(3.5));
        assert_eq!(record.benefits_score, Some(7.2));
        assert_eq!(record.job_title, "ML Engineer");
        assert_eq!(record.month_key().to_string(), "2024-03");
    }

    #[test]
    fn unparseable_date_drops_row() {
        let row = sample_row().with_field(FIELD_POSTING_DATE, "not a date");
        assert!(RecordNormalizer::normalize(&row).is_none());

        let row = RawRecord::default().with_field(FIELD_SALARY_USD, "100000");
        assert!(RecordNormalizer::normalize(&row).is_none());
    }

    #[test]
    fn accepts_alternate_date_formats() {
        for value in ["2024/03/05", "03/05/2024", "2024-03-05T12:30:00Z"] {
            let row = sample_row().with_field(FIELD_POSTING_DATE, value);
            let record = RecordNormalizer::normalize(&row).unwrap();
            assert_eq!(
                record.posting_date,
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                "format {value:?}"
            );
        }
    }

    #[test]
    fn bad_numerics_become_missing() {
        let row = sample_row()
            .with_field(FIELD_SALARY_USD, "n/a")
            .with_field(FIELD_YEARS_EXPERIENCE, "-2")
            .with_field(FIELD_BENEFITS_SCORE, "NaN");
        let record = RecordNormalizer::normalize(&row).unwrap();

        assert_eq!(record.salary_usd, None);
        assert_eq!(record.years_experience, None);
        assert_eq!(record.benefits_score, None);
    }

    #[test]
    fn missing_title_becomes_unknown() {
        let mut row = sample_row();
        row.0.remove(FIELD_JOB_TITLE);
        let record = RecordNormalizer::normalize(&row).unwrap();
        assert_eq!(record.job_title, UNKNOWN_TITLE);
    }
}
