// src/forecast/mod.rs - Forward coverage and bloom-probability forecasting

pub mod estimator;
pub mod training;
pub mod trend;

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::history::HistoricalRecord;
use crate::risk::RiskAssessmentResult;
use crate::waterbody::WaterbodyProfile;

pub use estimator::{BloomEstimator, HeuristicEstimator, TrainedEstimator, TrainingSummary};
pub use training::{bloom_month_fraction, FeatureVector, TrainingSample, TrainingSet, DEFAULT_DAYS_SINCE_BLOOM};
pub use trend::{fit_trend, TrendDirection, TrendFit};

pub const DEFAULT_CURRENT_COVERAGE: f64 = 20.0;
pub const DEFAULT_CHLOROPHYLL_A: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForecastRiskCategory {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl ForecastRiskCategory {
    pub fn classify(probability: f64, predicted_coverage: f64) -> Self {
        if predicted_coverage > 50.0 || probability >= 0.8 {
            ForecastRiskCategory::VeryHigh
        } else if predicted_coverage > 30.0 || probability >= 0.6 {
            ForecastRiskCategory::High
        } else if predicted_coverage > 15.0 || probability >= 0.4 {
            ForecastRiskCategory::Medium
        } else {
            ForecastRiskCategory::Low
        }
    }
}

impl fmt::Display for ForecastRiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ForecastRiskCategory::Low => "Low",
            ForecastRiskCategory::Medium => "Medium",
            ForecastRiskCategory::High => "High",
            ForecastRiskCategory::VeryHigh => "Very High",
        };
        f.write_str(label)
    }
}

/// Where the daily growth rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthModel {
    Trend,
    RuleBased,
}

/// Current state of the waterbody fed into a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthConditions {
    pub current_coverage: f64,
    pub chlorophyll_a: f64,
    pub temperature_factor: f64,
    pub nutrient_factor: f64,
    pub seasonal_factor: f64,
    pub reference_date: NaiveDate,
}

impl GrowthConditions {
    pub fn new(current_coverage: f64, chlorophyll_a: f64, reference_date: NaiveDate) -> Self {
        Self {
            current_coverage,
            chlorophyll_a,
            temperature_factor: 1.0,
            nutrient_factor: 1.0,
            seasonal_factor: 1.0,
            reference_date,
        }
    }

    /// Starts from an assessment's coverage; chlorophyll-a defaults to 10 μg/L when unknown
    pub fn from_assessment(risk: &RiskAssessmentResult, chlorophyll_a: Option<f64>, reference_date: NaiveDate) -> Self {
        Self::new(
            risk.algae_coverage_percent,
            chlorophyll_a.unwrap_or(DEFAULT_CHLOROPHYLL_A),
            reference_date,
        )
    }
}

impl Default for GrowthConditions {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENT_COVERAGE, DEFAULT_CHLOROPHYLL_A, Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthForecast {
    pub bloom_probability: f64,
    pub will_bloom: bool,
    pub predicted_coverage_percent: f64,
    pub risk_category: ForecastRiskCategory,
    pub confidence: f64,
    pub horizon_days: u32,
    pub forecast_date: NaiveDate,
    /// Coverage percentage points per day
    pub growth_rate_per_day: f64,
    pub growth_model: GrowthModel,
    pub estimator: String,
    /// Observed and synthetic sample counts when the estimator was trained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendFit>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionPoint {
    pub day: u32,
    pub date: NaiveDate,
    pub predicted_coverage: f64,
    pub risk_category: ForecastRiskCategory,
    pub bloom_probability: f64,
}

/// Projects algae coverage forward and estimates bloom probability
pub struct GrowthPredictor {
    config: ForecastConfig,
    profile: WaterbodyProfile,
    /// Historical bloom-frequency feature, shared by training and prediction
    bloom_frequency: f64,
    estimator: Box<dyn BloomEstimator>,
}

impl fmt::Debug for GrowthPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowthPredictor")
            .field("config", &self.config)
            .field("profile", &self.profile)
            .field("bloom_frequency", &self.bloom_frequency)
            .field("estimator", &self.estimator.name())
            .finish()
    }
}

impl GrowthPredictor {
    /// Predictor using the weighted-rule estimator
    pub fn new(config: ForecastConfig, profile: WaterbodyProfile) -> Self {
        Self {
            config,
            bloom_frequency: profile.bloom_frequency(),
            profile,
            estimator: Box::new(HeuristicEstimator),
        }
    }

    pub fn with_estimator(mut self, estimator: Box<dyn BloomEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Trains a classifier from the historical series, padded with synthetic samples when short.
    /// Keeps the heuristic estimator if training is not possible.
    pub fn from_history(config: ForecastConfig, profile: WaterbodyProfile, history: &[HistoricalRecord]) -> Self {
        let mut predictor = Self::new(config, profile);
        if history.is_empty() {
            log::info!("No historical series, using heuristic bloom estimator");
            return predictor;
        }

        predictor.bloom_frequency = bloom_month_fraction(history);
        let mut set = TrainingSet::from_history(&predictor.profile, history, predictor.bloom_frequency);
        set.augment_with_synthetic(
            &predictor.profile,
            predictor.config.min_training_samples,
            predictor.config.synthetic_seed,
        );

        match TrainedEstimator::fit(&set, predictor.config.min_training_samples) {
            Some(trained) => predictor.with_estimator(Box::new(trained)),
            None => {
                log::info!("Falling back to heuristic bloom estimator");
                predictor
            }
        }
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn bloom_frequency(&self) -> f64 {
        self.bloom_frequency
    }

    /// Feature vector the estimator sees for a forecast landing in `month`
    pub fn features_for_month(&self, month: u32) -> FeatureVector {
        FeatureVector::for_month(&self.profile, month, DEFAULT_DAYS_SINCE_BLOOM).with_bloom_frequency(self.bloom_frequency)
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Tiered base rate scaled by the condition multipliers, before perturbation
    pub fn base_growth_rate(&self, conditions: &GrowthConditions) -> f64 {
        self.config.growth.rate_for(conditions.chlorophyll_a)
            * conditions.temperature_factor
            * conditions.nutrient_factor
            * conditions.seasonal_factor
    }

    /// Rule-based daily growth rate with bounded Gaussian perturbation
    pub fn growth_rate_with_rng<R: Rng + ?Sized>(&self, conditions: &GrowthConditions, rng: &mut R) -> f64 {
        let tiers = &self.config.growth;
        let base = self.base_growth_rate(conditions);

        let noise = if self.config.noise_std > 0.0 {
            let bound = self.config.noise_std * self.config.noise_bound_sigma;
            Normal::new(0.0, self.config.noise_std)
                .map(|normal| normal.sample(rng).clamp(-bound, bound))
                .unwrap_or(0.0)
        } else {
            0.0
        };

        (base + noise).clamp(tiers.min_rate, tiers.max_rate)
    }

    pub fn growth_rate(&self, conditions: &GrowthConditions) -> f64 {
        self.growth_rate_with_rng(conditions, &mut self.rng())
    }

    /// Daily rate from a fitted trend; the weekly relative rate is spread over seven days
    pub fn growth_rate_from_trend(&self, trend: &TrendFit) -> f64 {
        let tiers = &self.config.growth;
        (trend.rate_percent_per_week / 7.0).clamp(tiers.min_rate, tiers.max_rate)
    }

    /// Forecast over the configured horizon
    pub fn forecast(&self, conditions: &GrowthConditions, history: &[HistoricalRecord]) -> GrowthForecast {
        self.forecast_with_rng(conditions, history, self.config.horizon_days, &mut self.rng())
    }

    pub fn forecast_with_rng<R: Rng + ?Sized>(
        &self,
        conditions: &GrowthConditions,
        history: &[HistoricalRecord],
        days_ahead: u32,
        rng: &mut R,
    ) -> GrowthForecast {
        let trend = if history.len() >= self.config.min_trend_points {
            fit_trend(history, self.config.min_trend_points)
        } else {
            if !history.is_empty() {
                log::info!(
                    "{} historical points (< {}), using rule-based growth rate",
                    history.len(),
                    self.config.min_trend_points
                );
            }
            None
        };

        let (growth_rate_per_day, growth_model) = match &trend {
            Some(fit) => (self.growth_rate_from_trend(fit), GrowthModel::Trend),
            None => (self.growth_rate_with_rng(conditions, rng), GrowthModel::RuleBased),
        };

        let forecast_date = conditions.reference_date + Duration::days(days_ahead as i64);
        let features = self.features_for_month(forecast_date.month());
        let bloom_probability = self.estimator.probability(&features).clamp(0.0, 1.0);
        let will_bloom = bloom_probability > 0.5;

        let predicted_coverage_percent =
            (conditions.current_coverage + growth_rate_per_day * days_ahead as f64).clamp(0.0, 100.0);
        let risk_category = ForecastRiskCategory::classify(bloom_probability, predicted_coverage_percent);
        let confidence = if will_bloom {
            bloom_probability
        } else {
            1.0 - bloom_probability
        };

        GrowthForecast {
            bloom_probability,
            will_bloom,
            predicted_coverage_percent,
            risk_category,
            confidence,
            horizon_days: days_ahead,
            forecast_date,
            growth_rate_per_day,
            growth_model,
            estimator: self.estimator.name().to_string(),
            training: self.estimator.training_summary(),
            trend,
            recommendations: recommendations(risk_category, bloom_probability, days_ahead),
        }
    }

    /// Day-by-day projection, each day starting from the previous day's coverage
    pub fn progression(&self, conditions: &GrowthConditions, days: u32) -> Vec<ProgressionPoint> {
        let mut rng = self.rng();
        let mut state = conditions.clone();
        let mut points = Vec::with_capacity(days as usize);

        for day in 1..=days {
            state.chlorophyll_a = state.current_coverage * 0.5;
            let step = self.forecast_with_rng(&state, &[], 1, &mut rng);
            points.push(ProgressionPoint {
                day,
                date: step.forecast_date,
                predicted_coverage: step.predicted_coverage_percent,
                risk_category: step.risk_category,
                bloom_probability: step.bloom_probability,
            });
            state.current_coverage = step.predicted_coverage_percent;
            state.reference_date = step.forecast_date;
        }

        points
    }
}

/// Management actions for a forecast risk category
pub fn recommendations(category: ForecastRiskCategory, probability: f64, days_ahead: u32) -> Vec<String> {
    let prob = format!("{:.1}%", probability * 100.0);
    match category {
        ForecastRiskCategory::VeryHigh => vec![
            format!("URGENT: Very high bloom risk (prob: {}) within {} days", prob, days_ahead),
            "Implement emergency response protocols immediately".to_string(),
            "Increase monitoring to daily frequency".to_string(),
            "Prepare algaecide treatment equipment".to_string(),
            "Issue public health advisory".to_string(),
        ],
        ForecastRiskCategory::High => vec![
            format!("HIGH ALERT: Elevated bloom risk (prob: {}) for next {} days", prob, days_ahead),
            "Increase monitoring frequency (2-3x per week)".to_string(),
            "Reduce nutrient inputs immediately".to_string(),
            "Prepare treatment measures".to_string(),
            "Consider preemptive action".to_string(),
        ],
        ForecastRiskCategory::Medium => vec![
            format!("MODERATE: Watch for bloom development (prob: {})", prob),
            "Maintain regular monitoring schedule".to_string(),
            "Review nutrient management practices".to_string(),
            "Ensure treatment readiness".to_string(),
        ],
        ForecastRiskCategory::Low => vec![
            format!("LOW: Minimal bloom risk currently (prob: {})", prob),
            "Continue standard monitoring program".to_string(),
            "Maintain preventive measures".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterbody::WaterQualityGrade;
    use assert_approx_eq::assert_approx_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quiet_config() -> ForecastConfig {
        ForecastConfig {
            noise_std: 0.0,
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn category_thresholds() {
        assert_eq!(ForecastRiskCategory::classify(0.1, 55.0), ForecastRiskCategory::VeryHigh);
        assert_eq!(ForecastRiskCategory::classify(0.8, 0.0), ForecastRiskCategory::VeryHigh);
        assert_eq!(ForecastRiskCategory::classify(0.6, 0.0), ForecastRiskCategory::High);
        assert_eq!(ForecastRiskCategory::classify(0.1, 31.0), ForecastRiskCategory::High);
        assert_eq!(ForecastRiskCategory::classify(0.1, 16.0), ForecastRiskCategory::Medium);
        assert_eq!(ForecastRiskCategory::classify(0.39, 15.0), ForecastRiskCategory::Low);
    }

    #[test]
    fn rule_based_rate_tiers_and_multipliers() {
        let predictor = GrowthPredictor::new(quiet_config(), WaterbodyProfile::default());
        let mut conditions = GrowthConditions::new(20.0, 35.0, date(2024, 1, 15));
        assert_approx_eq!(predictor.growth_rate(&conditions), 0.8, 1e-12);

        conditions.chlorophyll_a = 20.0;
        conditions.temperature_factor = 2.0;
        assert_approx_eq!(predictor.growth_rate(&conditions), 1.0, 1e-12);

        conditions.chlorophyll_a = 3.0;
        assert_approx_eq!(predictor.growth_rate(&conditions), 0.1, 1e-12);

        conditions.chlorophyll_a = 40.0;
        conditions.nutrient_factor = 5.0;
        assert_approx_eq!(predictor.growth_rate(&conditions), 2.0, 1e-12);
    }

    #[test]
    fn perturbation_is_bounded_and_seeded() {
        let predictor = GrowthPredictor::new(ForecastConfig::default(), WaterbodyProfile::default());
        let conditions = GrowthConditions::new(20.0, 10.0, date(2024, 6, 1));
        let first = predictor.growth_rate(&conditions);
        let second = predictor.growth_rate(&conditions);
        assert_eq!(first, second);

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let rate = predictor.growth_rate_with_rng(&conditions, &mut rng);
            assert!((rate - 0.2).abs() <= 0.15 + 1e-12);
        }
    }

    #[test]
    fn heuristic_forecast_projects_coverage() {
        let profile = WaterbodyProfile {
            pollution_source_count: 5,
            water_quality_grade: WaterQualityGrade::D,
            ..WaterbodyProfile::default()
        };
        let predictor = GrowthPredictor::new(quiet_config(), profile);
        let conditions = GrowthConditions::new(20.0, 18.0, date(2024, 8, 1));
        let forecast = predictor.forecast(&conditions, &[]);

        assert_eq!(forecast.growth_model, GrowthModel::RuleBased);
        assert_eq!(forecast.estimator, "heuristic");
        assert_eq!(forecast.horizon_days, 14);
        assert_eq!(forecast.forecast_date, date(2024, 8, 15));
        assert_approx_eq!(forecast.growth_rate_per_day, 0.5, 1e-12);
        assert_approx_eq!(forecast.predicted_coverage_percent, 27.0, 1e-12);
        // 0.2 + 0.2*8/9 + 0.26 + 0.24 + 0
        let expected = 0.2 + 0.2 * 8.0 / 9.0 + 0.5;
        assert_approx_eq!(forecast.bloom_probability, expected, 1e-12);
        assert!(forecast.will_bloom);
        assert_approx_eq!(forecast.confidence, expected, 1e-12);
        assert_eq!(forecast.risk_category, ForecastRiskCategory::VeryHigh);
        assert!(forecast.recommendations[0].starts_with("URGENT"));
    }

    #[test]
    fn winter_forecast_is_low_with_inverse_confidence() {
        let predictor = GrowthPredictor::new(quiet_config(), WaterbodyProfile::default());
        let conditions = GrowthConditions::new(2.0, 2.0, date(2024, 1, 1));
        let forecast = predictor.forecast(&conditions, &[]);

        let p = 0.2 * 5.0 / 9.0 + 0.3;
        assert_approx_eq!(forecast.bloom_probability, p, 1e-12);
        assert!(!forecast.will_bloom);
        assert_approx_eq!(forecast.confidence, 1.0 - p, 1e-12);
        assert_eq!(forecast.risk_category, ForecastRiskCategory::Medium);
        assert_eq!(forecast.recommendations.len(), 4);
    }

    #[test]
    fn coverage_is_clamped() {
        let predictor = GrowthPredictor::new(quiet_config(), WaterbodyProfile::default());
        let conditions = GrowthConditions::new(99.0, 50.0, date(2024, 7, 1));
        let forecast = predictor.forecast_with_rng(&conditions, &[], 30, &mut StdRng::seed_from_u64(1));
        assert_eq!(forecast.predicted_coverage_percent, 100.0);
    }

    #[test]
    fn trend_mode_with_enough_history() {
        let history: Vec<HistoricalRecord> = (1..=12)
            .map(|m| HistoricalRecord {
                date: date(2023, m, 1),
                chlorophyll_a: 10.0 + 2.0 * m as f64,
                ndvi: 0.1,
                fai: 0.0,
                severity: None,
                coverage_estimate: None,
            })
            .collect();
        let predictor = GrowthPredictor::new(quiet_config(), WaterbodyProfile::default());
        let conditions = GrowthConditions::new(10.0, 30.0, date(2024, 1, 1));
        let forecast = predictor.forecast(&conditions, &history);

        assert_eq!(forecast.growth_model, GrowthModel::Trend);
        let trend = forecast.trend.as_ref().unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        let expected_rate = trend.rate_percent_per_week / 7.0;
        assert_approx_eq!(forecast.growth_rate_per_day, expected_rate, 1e-12);

        // five points: rule-based
        let forecast = predictor.forecast(&conditions, &history[..5]);
        assert_eq!(forecast.growth_model, GrowthModel::RuleBased);
        assert!(forecast.trend.is_none());
    }

    #[test]
    fn progression_refeeds_coverage() {
        let predictor = GrowthPredictor::new(quiet_config(), WaterbodyProfile::default());
        let conditions = GrowthConditions::new(20.0, 10.0, date(2024, 5, 30));
        let points = predictor.progression(&conditions, 5);

        assert_eq!(points.len(), 5);
        assert_eq!(points[0].day, 1);
        assert_eq!(points[0].date, date(2024, 5, 31));
        assert_eq!(points[4].date, date(2024, 6, 4));
        // chl-a is re-derived as half the coverage, 10 -> 0.2/day
        assert_approx_eq!(points[0].predicted_coverage, 20.2, 1e-9);
        for pair in points.windows(2) {
            assert!(pair[1].predicted_coverage >= pair[0].predicted_coverage);
        }
    }

    #[test]
    fn predictor_from_short_history_uses_padding() {
        let history: Vec<HistoricalRecord> = (1..=12)
            .map(|m| HistoricalRecord {
                date: date(2023, m, 1),
                chlorophyll_a: if (7..=9).contains(&m) { 30.0 } else { 4.0 },
                ndvi: 0.1,
                fai: 0.0,
                severity: None,
                coverage_estimate: None,
            })
            .collect();
        let predictor = GrowthPredictor::from_history(quiet_config(), WaterbodyProfile::default(), &history);
        assert_eq!(predictor.estimator_name(), "trained");
        assert_approx_eq!(predictor.bloom_frequency(), 0.25, 1e-12);

        let predictor = GrowthPredictor::from_history(quiet_config(), WaterbodyProfile::default(), &[]);
        assert_eq!(predictor.estimator_name(), "heuristic");
    }

    #[test]
    fn forecast_features_match_training_features() {
        // eight months, three of them blooming
        let history: Vec<HistoricalRecord> = (3..=10)
            .map(|m| HistoricalRecord {
                date: date(2023, m, 1),
                chlorophyll_a: if (7..=9).contains(&m) { 25.0 } else { 5.0 },
                ndvi: 0.1,
                fai: 0.0,
                severity: None,
                coverage_estimate: None,
            })
            .collect();
        let profile = WaterbodyProfile {
            historical_bloom_count: 9,
            history_years: 1,
            ..WaterbodyProfile::default()
        };
        let predictor = GrowthPredictor::from_history(quiet_config(), profile.clone(), &history);
        assert_eq!(predictor.estimator_name(), "trained");
        assert_approx_eq!(predictor.bloom_frequency(), 3.0 / 8.0, 1e-12);

        let set = TrainingSet::from_history(&profile, &history, bloom_month_fraction(&history));
        let august_sample = set
            .samples()
            .iter()
            .find(|s| !s.synthetic && s.features.month == 8.0)
            .unwrap();
        assert_eq!(predictor.features_for_month(8), august_sample.features);

        // the profile's own blooms-per-year figure plays no part once history is known
        let plain = GrowthPredictor::from_history(quiet_config(), WaterbodyProfile::default(), &history);
        let conditions = GrowthConditions::new(10.0, 12.0, date(2024, 7, 18));
        assert_eq!(
            predictor.forecast(&conditions, &history).bloom_probability,
            plain.forecast(&conditions, &history).bloom_probability
        );
    }
}
