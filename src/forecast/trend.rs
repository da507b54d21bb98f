// src/forecast/trend.rs - Least-squares chlorophyll-a trend over a monthly series

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::history::HistoricalRecord;

/// Weeks per month used to express the monthly slope as a weekly rate
const WEEKS_PER_MONTH: f64 = 4.33;

/// Rates below this magnitude (%/week) count as stable
const STABLE_RATE_PERCENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    /// μg/L per month
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub mean_chlorophyll_a: f64,
    /// Slope relative to the series mean, %/week
    pub rate_percent_per_week: f64,
    pub direction: TrendDirection,
    pub confidence: f64,
    pub points: usize,
}

/// Fit chlorophyll-a against elapsed months; `None` below `min_points` or for a degenerate time axis
pub fn fit_trend(records: &[HistoricalRecord], min_points: usize) -> Option<TrendFit> {
    let usable: Vec<&HistoricalRecord> = records.iter().filter(|r| r.chlorophyll_a.is_finite()).collect();
    let n = usable.len();
    if n < min_points.max(2) {
        log::info!(
            "Trend mode needs {} monthly points, got {}",
            min_points,
            n
        );
        return None;
    }

    let start = usable.iter().map(|r| r.month_index()).min()?;
    let t: Vec<f64> = usable.iter().map(|r| (r.month_index() - start) as f64).collect();
    let y = DVector::from_iterator(n, usable.iter().map(|r| r.chlorophyll_a));

    let mut design = DMatrix::from_element(n, 2, 1.0);
    for (i, elapsed) in t.iter().enumerate() {
        design[(i, 1)] = *elapsed;
    }

    let normal = design.transpose() * &design;
    let rhs = design.transpose() * &y;
    let coefficients = match normal.lu().solve(&rhs) {
        Some(c) => c,
        None => {
            log::info!("Historical series spans a single month, no trend fitted");
            return None;
        }
    };
    let intercept = coefficients[0];
    let slope = coefficients[1];
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }

    let mean = y.mean();
    let fitted = &design * &coefficients;
    let ss_res: f64 = y.iter().zip(fitted.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { (1.0 - ss_res / ss_tot).max(0.0) } else { 0.0 };

    let rate_percent_per_week = if mean > 0.0 {
        slope / mean / WEEKS_PER_MONTH * 100.0
    } else {
        0.0
    };

    let direction = if rate_percent_per_week.abs() < STABLE_RATE_PERCENT {
        TrendDirection::Stable
    } else if rate_percent_per_week > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    let confidence = (r_squared * n as f64 / 12.0).min(1.0);

    log::debug!(
        "Trend fit: slope {:.3}/month, R² {:.3}, {:.2}%/week ({:?})",
        slope,
        r_squared,
        rate_percent_per_week,
        direction
    );

    Some(TrendFit {
        slope,
        intercept,
        r_squared,
        mean_chlorophyll_a: mean,
        rate_percent_per_week,
        direction,
        confidence,
        points: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;

    fn series(values: impl Iterator<Item = (u32, f64)>) -> Vec<HistoricalRecord> {
        values
            .map(|(month, chl)| HistoricalRecord {
                date: NaiveDate::from_ymd_opt(2023, month, 1).unwrap(),
                chlorophyll_a: chl,
                ndvi: 0.0,
                fai: 0.0,
                severity: None,
                coverage_estimate: None,
            })
            .collect()
    }

    #[test]
    fn linear_series_fits_exactly() {
        let records = series((1..=12).map(|m| (m, 10.0 + 2.0 * m as f64)));
        let fit = fit_trend(&records, 6).unwrap();

        assert_approx_eq!(fit.slope, 2.0, 1e-9);
        assert_approx_eq!(fit.intercept, 12.0, 1e-9);
        assert_approx_eq!(fit.r_squared, 1.0, 1e-9);
        assert_eq!(fit.direction, TrendDirection::Increasing);
        assert_approx_eq!(fit.confidence, 1.0, 1e-9);
        assert_approx_eq!(fit.rate_percent_per_week, 2.0 / 23.0 / 4.33 * 100.0, 1e-9);
    }

    #[test]
    fn flat_series_is_stable_with_zero_r_squared() {
        let records = series((1..=8).map(|m| (m, 12.0)));
        let fit = fit_trend(&records, 6).unwrap();
        assert_approx_eq!(fit.slope, 0.0, 1e-9);
        assert_eq!(fit.r_squared, 0.0);
        assert_eq!(fit.direction, TrendDirection::Stable);
        assert_eq!(fit.confidence, 0.0);
    }

    #[test]
    fn declining_series() {
        let records = series((1..=6).map(|m| (m, 40.0 - 3.0 * m as f64)));
        let fit = fit_trend(&records, 6).unwrap();
        assert_eq!(fit.direction, TrendDirection::Decreasing);
        assert_approx_eq!(fit.confidence, 0.5, 1e-9);
    }

    #[test]
    fn too_few_points_declines() {
        let records = series((1..=5).map(|m| (m, m as f64)));
        assert!(fit_trend(&records, 6).is_none());
        assert!(fit_trend(&[], 6).is_none());
    }
}
