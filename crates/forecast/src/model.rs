//! Least-squares regression over the monthly dataset.
//!
//! The model maps {year, month, lag1, lag2, lag3} to the next month's
//! total. Fitting solves the normal equations with a tiny ridge term on
//! the feature diagonal so near-collinear histories (e.g. a constant year
//! column) still produce a usable solution.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{ForecastError, Result};

/// Canonical feature order. Persisted alongside the coefficients and
/// re-checked at prediction time; the two must never drift apart.
pub const FEATURE_COLUMNS: [&str; 5] = ["year", "month", "sales_lag_1", "sales_lag_2", "sales_lag_3"];

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Coefficient of determination on the chronological tail.
    pub r2: f64,
    /// Root mean squared error on the chronological tail, in cents.
    pub rmse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// A fitted linear model: intercept plus one coefficient per feature
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl SalesModel {
    /// Applies the model to a feature vector given in coefficient order.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(ForecastError::DegenerateModel(format!(
                "feature count mismatch: model has {}, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }
}

/// Fits the model on the chronological head of the dataset and evaluates
/// on the remaining tail (20%, at least one row; never shuffled — the
/// split must not leak future months into training).
pub fn train(dataset: &Dataset) -> Result<(SalesModel, Evaluation)> {
    let rows = &dataset.rows;
    if rows.is_empty() {
        return Err(ForecastError::DegenerateModel("no training rows".to_string()));
    }

    let n = rows.len();
    let test_len = (n * 2).div_ceil(10).max(1);
    let train_len = n.saturating_sub(test_len);

    // With a single usable row, fit and evaluate on the same data rather
    // than failing outright.
    let (train_rows, test_rows) = if train_len == 0 {
        (&rows[..], &rows[..])
    } else {
        (&rows[..train_len], &rows[train_len..])
    };

    let model = fit(train_rows)?;

    let mut ss_res = 0.0;
    let mut actuals = Vec::with_capacity(test_rows.len());
    for row in test_rows {
        let predicted = model.predict(&row.features())?;
        ss_res += (row.target - predicted).powi(2);
        actuals.push(row.target);
    }
    let mean = actuals.iter().sum::<f64>() / actuals.len() as f64;
    let ss_tot: f64 = actuals.iter().map(|y| (y - mean).powi(2)).sum();

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res < f64::EPSILON {
        1.0
    } else {
        0.0
    };
    let rmse = (ss_res / test_rows.len() as f64).sqrt();

    Ok((
        model,
        Evaluation {
            r2,
            rmse,
            train_rows: train_rows.len(),
            test_rows: test_rows.len(),
        },
    ))
}

fn fit(rows: &[crate::dataset::FeatureRow]) -> Result<SalesModel> {
    const P: usize = FEATURE_COLUMNS.len() + 1; // + intercept

    // Normal equations: (XᵀX) β = Xᵀy with the intercept as column 0.
    let mut xtx = [[0.0_f64; P]; P];
    let mut xty = [0.0_f64; P];
    for row in rows {
        let mut x = [1.0_f64; P];
        x[1..].copy_from_slice(&row.features());
        for i in 0..P {
            for j in 0..P {
                xtx[i][j] += x[i] * x[j];
            }
            xty[i] += x[i] * row.target;
        }
    }

    // Ridge term scaled to the matrix magnitude, skipping the intercept.
    let trace: f64 = (0..P).map(|i| xtx[i][i]).sum();
    let lambda = 1e-8 * (trace / P as f64) + 1e-12;
    for i in 1..P {
        xtx[i][i] += lambda;
    }

    let beta = solve(xtx, xty)?;
    Ok(SalesModel {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
    })
}

/// Gaussian elimination with partial pivoting.
fn solve<const P: usize>(mut a: [[f64; P]; P], mut b: [f64; P]) -> Result<[f64; P]> {
    for col in 0..P {
        let pivot_row = (col..P)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-12 {
            return Err(ForecastError::DegenerateModel(
                "singular normal equations".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..P {
            let factor = a[row][col] / a[col][col];
            for k in col..P {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0_f64; P];
    for row in (0..P).rev() {
        let mut sum = b[row];
        for k in row + 1..P {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::build_dataset;
    use chrono::{Months, NaiveDate};
    use common::Money;
    use store::MonthlyTotal;

    /// Arithmetic revenue trend: t_i = 10_000 + 1_000·i cents. The target
    /// is then exactly lag1 + 2_000, so a linear model can fit it with
    /// near-zero residual.
    fn trending_series(months: usize) -> Vec<MonthlyTotal> {
        let mut month = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..months)
            .map(|i| {
                let entry = MonthlyTotal {
                    month,
                    total: Money::from_cents(10_000 + 1_000 * i as i64),
                };
                month = month + Months::new(1);
                entry
            })
            .collect()
    }

    #[test]
    fn fits_a_linear_trend_with_high_accuracy() {
        let dataset = build_dataset(&trending_series(14)).unwrap();
        let (model, evaluation) = train(&dataset).unwrap();

        assert_eq!(evaluation.train_rows + evaluation.test_rows, dataset.rows.len());
        assert!(evaluation.test_rows >= 1);
        assert!(
            evaluation.r2 > 0.9,
            "expected near-perfect fit, got r2 = {}",
            evaluation.r2
        );
        assert!(
            evaluation.rmse < 100.0,
            "expected small error, got rmse = {} cents",
            evaluation.rmse
        );

        // The fitted model extrapolates the trend.
        let last = &dataset.rows[dataset.rows.len() - 1];
        let predicted = model.predict(&last.features()).unwrap();
        assert!(
            (predicted - last.target).abs() < 200.0,
            "predicted {predicted}, expected about {}",
            last.target
        );
    }

    #[test]
    fn split_is_chronological() {
        let dataset = build_dataset(&trending_series(14)).unwrap();
        let (_, evaluation) = train(&dataset).unwrap();
        // 10 usable rows → 8 train, 2 held-out tail rows.
        assert_eq!(evaluation.train_rows, 8);
        assert_eq!(evaluation.test_rows, 2);
    }

    #[test]
    fn trains_even_on_the_minimum_dataset() {
        // 5 months → a single usable row; fit and evaluate on it.
        let dataset = build_dataset(&trending_series(5)).unwrap();
        let (model, evaluation) = train(&dataset).unwrap();
        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(evaluation.train_rows, 1);
        assert!(model.coefficients.len() == FEATURE_COLUMNS.len());
    }

    #[test]
    fn predict_rejects_wrong_feature_count() {
        let model = SalesModel {
            intercept: 0.0,
            coefficients: vec![1.0; 5],
        };
        assert!(model.predict(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn empty_dataset_cannot_train() {
        let dataset = Dataset { rows: Vec::new() };
        assert!(matches!(
            train(&dataset),
            Err(ForecastError::DegenerateModel(_))
        ));
    }
}
