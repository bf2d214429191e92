//! Monthly dataset construction with lag features.

use chrono::{Datelike, Months, NaiveDate};
use common::Money;
use store::MonthlyTotal;

use crate::error::{ForecastError, Result};

/// Minimum number of monthly buckets needed before any row survives the
/// lag/target trimming (3 lags behind + 1 target ahead).
pub const MIN_MONTHS: usize = 5;

/// One usable training row. Amounts are cents as floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// The month this row describes.
    pub period: NaiveDate,
    pub year: f64,
    pub month: f64,
    /// Previous month's total.
    pub lag1: f64,
    /// Total from two months back.
    pub lag2: f64,
    /// Total from three months back.
    pub lag3: f64,
    /// This month's observed total.
    pub total: f64,
    /// Next month's total — the regression target.
    pub target: f64,
}

impl FeatureRow {
    /// Feature vector in [`crate::model::FEATURE_COLUMNS`] order.
    pub fn features(&self) -> [f64; 5] {
        [self.year, self.month, self.lag1, self.lag2, self.lag3]
    }
}

/// An ordered set of usable rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub rows: Vec<FeatureRow>,
}

/// Completes the series between its first and last observed months,
/// inserting zero totals for months with no completed sales (month-start
/// resampling semantics).
pub fn fill_month_gaps(totals: &[MonthlyTotal]) -> Vec<MonthlyTotal> {
    let Some(first) = totals.first() else {
        return Vec::new();
    };
    let Some(last) = totals.last() else {
        return Vec::new();
    };

    let mut filled = Vec::new();
    let mut cursor = first.month;
    let mut observed = totals.iter().peekable();
    while cursor <= last.month {
        let total = if observed.peek().is_some_and(|m| m.month == cursor) {
            observed.next().map_or_else(Money::zero, |m| m.total)
        } else {
            Money::zero()
        };
        filled.push(MonthlyTotal {
            month: cursor,
            total,
        });
        cursor = cursor + Months::new(1);
    }
    filled
}

/// Builds the training dataset: lag-1/2/3 features and a next-month target
/// per row, dropping the edge rows that miss either. Fails with
/// `InsufficientHistory` when fewer than [`MIN_MONTHS`] buckets exist.
pub fn build_dataset(totals: &[MonthlyTotal]) -> Result<Dataset> {
    let filled = fill_month_gaps(totals);
    if filled.len() < MIN_MONTHS {
        return Err(ForecastError::InsufficientHistory {
            available: filled.len(),
            required: MIN_MONTHS,
        });
    }

    let cents = |m: &MonthlyTotal| m.total.cents() as f64;
    let rows = (3..filled.len() - 1)
        .map(|i| FeatureRow {
            period: filled[i].month,
            year: f64::from(filled[i].month.year()),
            month: f64::from(filled[i].month.month()),
            lag1: cents(&filled[i - 1]),
            lag2: cents(&filled[i - 2]),
            lag3: cents(&filled[i - 3]),
            total: cents(&filled[i]),
            target: cents(&filled[i + 1]),
        })
        .collect();

    Ok(Dataset { rows })
}

/// Lag features for predicting the month after the latest observed one:
/// the latest total and its two predecessors (zero where history is too
/// short). Returns the target period alongside. None on empty history.
pub fn latest_lags(filled: &[MonthlyTotal]) -> Option<(NaiveDate, [f64; 3])> {
    let last = filled.last()?;
    let n = filled.len();
    let cents_at = |i: usize| filled.get(i).map_or(0.0, |m| m.total.cents() as f64);

    let lags = [
        cents_at(n - 1),
        if n >= 2 { cents_at(n - 2) } else { 0.0 },
        if n >= 3 { cents_at(n - 3) } else { 0.0 },
    ];
    Some((last.month + Months::new(1), lags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: (i32, u32), totals_cents: &[i64]) -> Vec<MonthlyTotal> {
        let mut month = NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap();
        totals_cents
            .iter()
            .map(|&cents| {
                let entry = MonthlyTotal {
                    month,
                    total: Money::from_cents(cents),
                };
                month = month + Months::new(1);
                entry
            })
            .collect()
    }

    #[test]
    fn six_month_series_yields_two_rows_with_hand_computed_shifts() {
        let totals = series((2024, 1), &[100, 200, 150, 300, 250, 400]);
        let dataset = build_dataset(&totals).unwrap();

        assert_eq!(dataset.rows.len(), 2);

        let row = &dataset.rows[0]; // April 2024
        assert_eq!(row.period, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(row.lag1, 150.0);
        assert_eq!(row.lag2, 200.0);
        assert_eq!(row.lag3, 100.0);
        assert_eq!(row.total, 300.0);
        assert_eq!(row.target, 250.0);

        let row = &dataset.rows[1]; // May 2024
        assert_eq!(row.lag1, 300.0);
        assert_eq!(row.lag2, 150.0);
        assert_eq!(row.lag3, 200.0);
        assert_eq!(row.total, 250.0);
        assert_eq!(row.target, 400.0);
    }

    #[test]
    fn fewer_than_five_months_is_insufficient() {
        let totals = series((2024, 1), &[100, 200, 150, 300]);
        let result = build_dataset(&totals);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientHistory {
                available: 4,
                required: 5
            })
        ));
    }

    #[test]
    fn empty_history_is_insufficient() {
        assert!(matches!(
            build_dataset(&[]),
            Err(ForecastError::InsufficientHistory { available: 0, .. })
        ));
    }

    #[test]
    fn gaps_between_observed_months_count_as_zero() {
        // January and April observed; February and March missing.
        let totals = vec![
            MonthlyTotal {
                month: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                total: Money::from_cents(100),
            },
            MonthlyTotal {
                month: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                total: Money::from_cents(400),
            },
        ];

        let filled = fill_month_gaps(&totals);
        assert_eq!(filled.len(), 4);
        assert_eq!(filled[1].total, Money::zero());
        assert_eq!(filled[2].total, Money::zero());
        assert_eq!(filled[3].total.cents(), 400);
    }

    #[test]
    fn latest_lags_point_at_the_following_month() {
        let totals = series((2024, 1), &[100, 200, 150]);
        let (period, lags) = latest_lags(&totals).unwrap();
        assert_eq!(period, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(lags, [150.0, 200.0, 100.0]);
    }

    #[test]
    fn latest_lags_defaults_missing_history_to_zero() {
        let totals = series((2024, 1), &[500]);
        let (period, lags) = latest_lags(&totals).unwrap();
        assert_eq!(period, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(lags, [500.0, 0.0, 0.0]);
        assert!(latest_lags(&[]).is_none());
    }

    #[test]
    fn year_boundary_rolls_over() {
        let totals = series((2023, 12), &[100]);
        let (period, _) = latest_lags(&totals).unwrap();
        assert_eq!(period, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
