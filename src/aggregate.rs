//! Aggregation engine
//!
//! A single pass folds normalized records into three keyed tables (monthly
//! statistics, salary series, job-title counts), then a second pass over the
//! keys only derives the averages. Accumulators stay private to this module,
//! so a partially-averaged entry is never observable.

use std::collections::HashMap;

use crate::normalizer::RecordNormalizer;
use crate::types::{
    AggregateTables, MissingValuePolicy, MonthKey, MonthlyStats, NormalizedRecord, RawRecord,
    SalaryStats,
};

/// Aggregation engine, carrying the missing-value policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    policy: MissingValuePolicy,
}

impl Aggregator {
    pub fn new(policy: MissingValuePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingValuePolicy {
        self.policy
    }

    /// Normalize raw rows and aggregate the survivors.
    ///
    /// Rows with an unparseable posting date are excluded from every table
    /// and counted in `skipped_records`.
    pub fn aggregate_rows<I>(&self, rows: I) -> AggregateTables
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut skipped = 0u32;
        let records: Vec<NormalizedRecord> = rows
            .into_iter()
            .filter_map(|row| {
                let record = RecordNormalizer::normalize(&row);
                if record.is_none() {
                    skipped += 1;
                }
                record
            })
            .collect();

        let mut tables = self.aggregate(records);
        tables.skipped_records = skipped;
        tables
    }

    /// Fold normalized records into the three aggregate tables.
    ///
    /// Single pass over the records, O(1) additional space per distinct
    /// month key; sums and counts are order-independent. Keys are created
    /// only by a contributing record, so every present entry has count >= 1
    /// and the finalize division is always defined.
    pub fn aggregate<I>(&self, records: I) -> AggregateTables
    where
        I: IntoIterator<Item = NormalizedRecord>,
    {
        let mut monthly: HashMap<MonthKey, MonthlyAcc> = HashMap::new();
        let mut salary: HashMap<MonthKey, SalaryAcc> = HashMap::new();
        let mut titles: HashMap<MonthKey, HashMap<String, u32>> = HashMap::new();

        let mut folded = 0u64;
        for record in records {
            let key = record.month_key();

            let month = monthly.entry(key).or_default();
            month.count += 1;
            month.salary.add(record.salary_usd, self.policy);
            month.experience.add(record.years_experience, self.policy);
            month.benefits.add(record.benefits_score, self.policy);

            let series = salary.entry(key).or_default();
            series.count += 1;
            series.salary.add(record.salary_usd, self.policy);

            *titles
                .entry(key)
                .or_default()
                .entry(record.job_title)
                .or_insert(0) += 1;

            folded += 1;
        }

        let tables = finalize(monthly, salary, titles);
        tracing::debug!(
            records = folded,
            months = tables.monthly.len(),
            "aggregation complete"
        );
        tables
    }
}

/// Second pass: keys only, never records. Converts accumulated sums into
/// derived averages.
fn finalize(
    monthly: HashMap<MonthKey, MonthlyAcc>,
    salary: HashMap<MonthKey, SalaryAcc>,
    titles: HashMap<MonthKey, HashMap<String, u32>>,
) -> AggregateTables {
    let monthly = monthly
        .into_iter()
        .map(|(key, acc)| {
            (
                key,
                MonthlyStats {
                    count: acc.count,
                    total_salary: acc.salary.sum,
                    total_experience: acc.experience.sum,
                    total_benefits: acc.benefits.sum,
                    avg_salary: acc.salary.average(),
                    avg_experience: acc.experience.average(),
                    avg_benefits: acc.benefits.average(),
                },
            )
        })
        .collect();

    let salary = salary
        .into_iter()
        .map(|(key, acc)| {
            (
                key,
                SalaryStats {
                    date: key.first_day(),
                    count: acc.count,
                    total_salary: acc.salary.sum,
                    avg_salary: acc.salary.average(),
                },
            )
        })
        .collect();

    AggregateTables {
        monthly,
        salary,
        titles,
        skipped_records: 0,
    }
}

/// Running sum plus the sample count that will divide it.
#[derive(Debug, Default)]
struct MetricAcc {
    sum: f64,
    samples: u32,
}

impl MetricAcc {
    fn add(&mut self, value: Option<f64>, policy: MissingValuePolicy) {
        match (value, policy) {
            (Some(v), _) => {
                self.sum += v;
                self.samples += 1;
            }
            // Missing counts as a zero-valued sample under the legacy policy.
            (None, MissingValuePolicy::TreatAsZero) => self.samples += 1,
            (None, MissingValuePolicy::ExcludeFromAverage) => {}
        }
    }

    fn average(&self) -> f64 {
        if self.samples > 0 {
            self.sum / f64::from(self.samples)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
struct MonthlyAcc {
    count: u32,
    salary: MetricAcc,
    experience: MetricAcc,
    benefits: MetricAcc,
}

#[derive(Debug, Default)]
struct SalaryAcc {
    count: u32,
    salary: MetricAcc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{
        FIELD_JOB_TITLE, FIELD_POSTING_DATE, FIELD_SALARY_USD, FIELD_YEARS_EXPERIENCE,
    };
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1e-9;

    fn record(date: (i32, u32, u32), salary: Option<f64>, title: &str) -> NormalizedRecord {
        NormalizedRecord {
            posting_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            salary_usd: salary,
            years_experience: Some(3.0),
            benefits_score: Some(7.0),
            job_title: title.to_string(),
        }
    }

    fn march_records() -> Vec<NormalizedRecord> {
        vec![
            record((2024, 3, 5), Some(100_000.0), "ML Engineer"),
            record((2024, 3, 20), Some(120_000.0), "ML Engineer"),
            record((2024, 3, 20), Some(90_000.0), "Data Scientist"),
        ]
    }

    #[test]
    fn triple_accumulation_shares_one_key_domain() {
        let tables = Aggregator::default().aggregate(march_records());
        let key: MonthKey = "2024-03".parse().unwrap();

        let month = &tables.monthly[&key];
        assert_eq!(month.count, 3);
        assert_eq!(month.total_salary, 310_000.0);
        assert!((month.avg_salary - 310_000.0 / 3.0).abs() < TOLERANCE);

        let series = &tables.salary[&key];
        assert_eq!(series.count, 3);
        assert_eq!(series.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!((series.avg_salary - month.avg_salary).abs() < TOLERANCE);

        let titles = &tables.titles[&key];
        assert_eq!(titles["ML Engineer"], 2);
        assert_eq!(titles["Data Scientist"], 1);
        assert_eq!(titles.len(), 2);
    }

    #[test]
    fn counts_sum_to_parseable_record_count() {
        let rows = vec![
            RawRecord::default()
                .with_field(FIELD_POSTING_DATE, "2024-03-05")
                .with_field(FIELD_JOB_TITLE, "ML Engineer"),
            RawRecord::default()
                .with_field(FIELD_POSTING_DATE, "2024-04-01")
                .with_field(FIELD_JOB_TITLE, "Data Scientist"),
            RawRecord::default()
                .with_field(FIELD_POSTING_DATE, "garbage")
                .with_field(FIELD_JOB_TITLE, "Dropped"),
            RawRecord::default()
                .with_field(FIELD_POSTING_DATE, "2024-04-09")
                .with_field(FIELD_JOB_TITLE, "ML Engineer"),
        ];

        let tables = Aggregator::default().aggregate_rows(rows);
        let total: u32 = tables.monthly.values().map(|m| m.count).sum();
        assert_eq!(total, 3);
        assert_eq!(tables.skipped_records, 1);
    }

    #[test]
    fn averages_divide_totals_by_counts() {
        let tables = Aggregator::default().aggregate(march_records());
        for stats in tables.monthly.values() {
            assert!(
                (stats.avg_salary - stats.total_salary / f64::from(stats.count)).abs() < TOLERANCE
            );
            assert!(
                (stats.avg_experience - stats.total_experience / f64::from(stats.count)).abs()
                    < TOLERANCE
            );
        }
    }

    #[test]
    fn missing_policy_zero_vs_exclude() {
        let records = vec![
            record((2024, 3, 5), Some(100_000.0), "ML Engineer"),
            record((2024, 3, 6), None, "ML Engineer"),
        ];
        let key: MonthKey = "2024-03".parse().unwrap();

        let zeroed = Aggregator::new(MissingValuePolicy::TreatAsZero).aggregate(records.clone());
        assert!((zeroed.monthly[&key].avg_salary - 50_000.0).abs() < TOLERANCE);

        let excluded =
            Aggregator::new(MissingValuePolicy::ExcludeFromAverage).aggregate(records);
        assert!((excluded.monthly[&key].avg_salary - 100_000.0).abs() < TOLERANCE);
        // Record count is unaffected by the policy.
        assert_eq!(excluded.monthly[&key].count, 2);
    }

    #[test]
    fn all_missing_field_averages_to_zero_under_exclude() {
        let records = vec![record((2024, 3, 5), None, "ML Engineer")];
        let tables = Aggregator::new(MissingValuePolicy::ExcludeFromAverage).aggregate(records);
        let key: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(tables.monthly[&key].avg_salary, 0.0);
    }

    #[test]
    fn unparseable_numeric_rows_still_count() {
        let rows = vec![RawRecord::default()
            .with_field(FIELD_POSTING_DATE, "2024-03-05")
            .with_field(FIELD_SALARY_USD, "not a number")
            .with_field(FIELD_YEARS_EXPERIENCE, "5")
            .with_field(FIELD_JOB_TITLE, "ML Engineer")];

        let tables = Aggregator::default().aggregate_rows(rows);
        let key: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(tables.monthly[&key].count, 1);
        // Legacy policy: the missing salary is a zero sample.
        assert_eq!(tables.monthly[&key].avg_salary, 0.0);
        assert_eq!(tables.monthly[&key].avg_experience, 5.0);
        assert_eq!(tables.skipped_records, 0);
    }

    #[test]
    fn empty_input_builds_empty_tables() {
        let tables = Aggregator::default().aggregate(Vec::new());
        assert!(tables.is_empty());
        assert!(tables.salary.is_empty());
        assert!(tables.titles.is_empty());
    }

    #[test]
    fn reaggregation_is_idempotent() {
        let records = march_records();
        let first = Aggregator::default().aggregate(records.clone());
        let second = Aggregator::default().aggregate(records);
        assert_eq!(first, second);
    }

    fn assert_tables_equivalent(a: &AggregateTables, b: &AggregateTables) {
        assert_eq!(a.sorted_month_keys(), b.sorted_month_keys());
        assert_eq!(a.titles, b.titles);
        for (key, left) in &a.monthly {
            let right = &b.monthly[key];
            assert_eq!(left.count, right.count);
            assert!((left.avg_salary - right.avg_salary).abs() < TOLERANCE);
            assert!((left.avg_experience - right.avg_experience).abs() < TOLERANCE);
            assert!((left.avg_benefits - right.avg_benefits).abs() < TOLERANCE);
        }
    }

    #[test]
    fn reversed_input_yields_equivalent_tables() {
        let records = vec![
            record((2024, 1, 2), Some(90_000.0), "Data Scientist"),
            record((2024, 3, 5), Some(100_000.0), "ML Engineer"),
            record((2024, 3, 20), None, "ML Engineer"),
            record((2025, 1, 1), Some(150_000.0), "AI Researcher"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = Aggregator::default().aggregate(records);
        let backward = Aggregator::default().aggregate(reversed);
        assert_tables_equivalent(&forward, &backward);
    }

    prop_compose! {
        fn arb_record()(
            month in 1u32..=12,
            day in 1u32..=28,
            salary in proptest::option::of(0.0f64..500_000.0),
            title_idx in 0usize..4,
        ) -> NormalizedRecord {
            let titles = ["ML Engineer", "Data Scientist", "AI Researcher", "Analyst"];
            record((2024, month, day), salary, titles[title_idx])
        }
    }

    // Fisher-Yates with a seeded LCG so the permutation is reproducible.
    fn shuffle(records: &mut [NormalizedRecord], mut seed: u64) {
        for i in (1..records.len()).rev() {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (seed >> 33) as usize % (i + 1);
            records.swap(i, j);
        }
    }

    proptest! {
        #[test]
        fn aggregation_is_order_independent(
            records in proptest::collection::vec(arb_record(), 0..40),
            seed in any::<u64>(),
        ) {
            let mut permuted = records.clone();
            shuffle(&mut permuted, seed);

            let a = Aggregator::default().aggregate(records);
            let b = Aggregator::default().aggregate(permuted);
            assert_tables_equivalent(&a, &b);
        }
    }
}
