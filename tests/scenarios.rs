use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use image::{Rgb, RgbImage};

use algae_risk_lib::config::{Config, DetectionConfig};
use algae_risk_lib::detection::{DetectionMethod, ImageAlgaeDetector};
use algae_risk_lib::forecast::{
    fit_trend, GrowthConditions, GrowthModel, GrowthPredictor, TrainingSummary, TrendDirection,
};
use algae_risk_lib::history::{read_history, HistoricalRecord};
use algae_risk_lib::indices::{IndexCalculator, IndexKind, IndexSet};
use algae_risk_lib::measurement::{MeasurementMetadata, Platform, SpectralMeasurement};
use algae_risk_lib::pipeline::{analyze_image, analyze_measurement_with_context};
use algae_risk_lib::risk::{AssessmentContext, FactorRisks, RiskAssessor, RiskLevel};
use algae_risk_lib::scientific::{FishMortalityRisk, ScientificMetrics, TrophicState};
use algae_risk_lib::{AlgaeRiskError, WaterbodyProfile};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn ndvi_from_sentinel_reflectance() {
    let measurement = SpectralMeasurement::from_pairs(
        [("B4", 0.05), ("B8", 0.35)],
        MeasurementMetadata::new(Platform::Sentinel2),
    );
    let ndvi = IndexCalculator::new().ndvi(&measurement);
    assert_approx_eq!(ndvi.mean, 0.75, 1e-12);
    assert_eq!(ndvi.interpretation, "Dense vegetation/algae");
}

#[test]
fn trophic_state_at_45_ug_per_litre() {
    let (tsi, state) = ScientificMetrics::new().tsi_carlson(45.0);
    assert_approx_eq!(tsi, 9.81 * 45.0_f64.ln() + 30.6, 1e-9);
    assert_approx_eq!(tsi, 68.0, 0.1);
    assert_eq!(state, TrophicState::Eutrophic);
}

#[test]
fn oxygen_depletion_at_45_ug_per_litre_and_25c() {
    let metrics = ScientificMetrics::new();
    assert_approx_eq!(metrics.do_saturation(25.0), 8.19, 1e-9);
    let reduction = metrics.do_reduction(45.0, 25.0);
    assert_approx_eq!(reduction, 5.94 / 8.19 * 100.0, 1e-9);
    assert_eq!(metrics.fish_mortality_risk(reduction, 45.0), FishMortalityRisk::Critical);
}

#[test]
fn zero_indices_outside_summer_are_minimal() {
    let assessor = RiskAssessor::default();
    let indices = IndexSet::from_values(0.0, 0.0, 0.0, 0.0, 0.0);
    let context = AssessmentContext::new(date(2024, 1, 15), 10.0);
    let result = assessor.assess(&indices, &context);

    assert_eq!(result.risk_score, 0.0);
    assert_eq!(result.risk_level, RiskLevel::Minimal);
    assert_eq!(result.algae_coverage_percent, 0.0);
}

#[test]
fn factor_weights_and_adjusted_ceiling() {
    let config = Config::default();
    assert_approx_eq!(config.risk.weights.sum(), 1.0, 1e-12);

    let assessor = RiskAssessor::default();
    let top = FactorRisks {
        chlorophyll: 1.0,
        turbidity: 1.0,
        floating_algae: 1.0,
        vegetation: 1.0,
    };
    assert_approx_eq!(assessor.combine(&top), 1.0, 1e-12);

    // every index at its top tier, peak season
    let indices = IndexSet::from_values(0.9, 0.5, 150.0, 100.0, 0.05);
    let summer = AssessmentContext::new(date(2024, 7, 1), 5.0);
    let result = assessor.assess(&indices, &summer);
    assert!(result.risk_score <= 1.0);
    assert_eq!(result.risk_level, RiskLevel::High);
}

#[test]
fn linear_history_gives_increasing_trend() {
    let history: Vec<HistoricalRecord> = (1..=12)
        .map(|m| HistoricalRecord {
            date: date(2023, m, 1),
            chlorophyll_a: 10.0 + 2.0 * m as f64,
            ndvi: 0.2,
            fai: 0.0,
            severity: None,
            coverage_estimate: None,
        })
        .collect();

    let fit = fit_trend(&history, 6).unwrap();
    assert_approx_eq!(fit.r_squared, 1.0, 1e-9);
    assert_eq!(fit.direction, TrendDirection::Increasing);

    let predictor = GrowthPredictor::new(Config::default().forecast, WaterbodyProfile::default());
    let forecast = predictor.forecast(&GrowthConditions::new(15.0, 20.0, date(2024, 1, 1)), &history);
    assert_eq!(forecast.growth_model, GrowthModel::Trend);
    assert!(forecast.predicted_coverage_percent > 15.0);
}

#[test]
fn short_history_degrades_to_rule_based() {
    let csv = "\
date,chlorophyll_a,ndvi,fai,severity,coverage_estimate
2024-03-01,8.0,0.2,0.0,,
2024-04-01,9.5,0.2,0.0,,
2024-05-01,12.0,0.3,0.0,Medium,12
";
    let history = read_history(csv.as_bytes()).unwrap();
    let predictor = GrowthPredictor::from_history(Config::default().forecast, WaterbodyProfile::default(), &history);
    let forecast = predictor.forecast(&GrowthConditions::new(10.0, 12.0, date(2024, 6, 1)), &history);

    assert_eq!(forecast.growth_model, GrowthModel::RuleBased);
    assert!(forecast.trend.is_none());
    assert!((0.0..=1.0).contains(&forecast.bloom_probability));
    assert!((0.0..=100.0).contains(&forecast.predicted_coverage_percent));
}

#[test]
fn year_of_history_trains_classifier_and_fits_trend() {
    // summer blooms in July to September, quiet otherwise
    let history: Vec<HistoricalRecord> = (1..=12)
        .map(|m| HistoricalRecord {
            date: date(2023, m, 1),
            chlorophyll_a: if (7..=9).contains(&m) { 25.0 } else { 4.0 + m as f64 * 0.5 },
            ndvi: 0.15,
            fai: 0.0,
            severity: None,
            coverage_estimate: None,
        })
        .collect();
    let measurement = SpectralMeasurement::from_pairs(
        [("B2", 0.04), ("B3", 0.06), ("B4", 0.05), ("B5", 0.07), ("B8", 0.20), ("B11", 0.02)],
        MeasurementMetadata::new(Platform::Sentinel2).with_cloud_cover(5.0),
    );
    let context = AssessmentContext::new(date(2024, 7, 20), 5.0);
    let report = analyze_measurement_with_context(&measurement, &history, &Config::default(), &context).unwrap();

    let forecast = &report.forecast;
    assert_eq!(forecast.growth_model, GrowthModel::Trend);
    assert!(forecast.trend.is_some());
    assert_eq!(forecast.estimator, "trained");
    // 12 observed months; 5 winter negatives plus 3 padding samples are synthetic
    assert_eq!(
        forecast.training,
        Some(TrainingSummary {
            observed_samples: 12,
            synthetic_samples: 8
        })
    );
    assert!((0.0..=1.0).contains(&forecast.bloom_probability));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["forecast"]["training"]["observed_samples"], 12);
    assert_eq!(json["forecast"]["training"]["synthetic_samples"], 8);
}

#[test]
fn modis_measurement_reports_fai_unavailable() {
    let measurement = SpectralMeasurement::from_pairs(
        [
            ("sur_refl_b01", 0.04),
            ("sur_refl_b02", 0.20),
            ("sur_refl_b03", 0.03),
            ("sur_refl_b04", 0.05),
        ],
        MeasurementMetadata::new(Platform::Modis).with_cloud_cover(70.0),
    );
    let context = AssessmentContext::new(date(2024, 8, 1), 70.0);
    let report = analyze_measurement_with_context(&measurement, &[], &Config::default(), &context).unwrap();

    let fai = report.indices.get(IndexKind::Fai);
    assert!(!fai.available);
    assert!(fai.interpretation.contains("MODIS"));
    assert!(report.risk.confidence >= 20.0 && report.risk.confidence <= 100.0);
}

#[test]
fn empty_measurement_is_not_analysed() {
    let measurement = SpectralMeasurement::from_pairs(
        [("B4", f64::NAN)],
        MeasurementMetadata::new(Platform::Landsat89),
    );
    let context = AssessmentContext::new(date(2024, 8, 1), 10.0);
    let result = analyze_measurement_with_context(&measurement, &[], &Config::default(), &context);
    assert!(matches!(result, Err(AlgaeRiskError::DataUnavailable(_))));
}

#[test]
fn disabled_segmentation_uses_mean_channel_fallback() {
    let mut config = Config::default();
    config.detection = DetectionConfig {
        enable_segmentation: false,
        ..DetectionConfig::default()
    };
    let image = RgbImage::from_pixel(16, 16, Rgb([60, 150, 60]));

    let detection = ImageAlgaeDetector::new(config.detection.clone()).detect(&image);
    assert_eq!(detection.method, DetectionMethod::MeanChannelFallback);
    assert_eq!(detection.detection_confidence, 60.0);
    // dominance 2.5 -> 37.5 %
    assert_approx_eq!(detection.coverage.total_coverage, 37.5, 1e-9);

    let report = analyze_image(&image, &config).unwrap();
    assert!(report.risk.image_based);
    assert!(report.risk.risk_score <= 1.0);
}
