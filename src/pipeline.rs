// src/pipeline.rs - End-to-end analysis of one measurement or photograph

use chrono::{NaiveDate, Utc};
use image::RgbImage;
use serde::Serialize;

use crate::config::Config;
use crate::detection::{DetectionResult, ImageAlgaeDetector};
use crate::errors::{AlgaeRiskError, Result};
use crate::forecast::{GrowthConditions, GrowthForecast, GrowthPredictor, ProgressionPoint};
use crate::history::HistoricalRecord;
use crate::indices::{ComprehensiveIndex, IndexCalculator, IndexKind, IndexSet, RgbIndices};
use crate::measurement::{Platform, SpectralMeasurement};
use crate::mitigation::MitigationPlan;
use crate::risk::{AssessmentContext, BloomOutlook, RiskAssessmentResult, RiskAssessor, RiskLevel};
use crate::scientific::{EnvironmentalImpact, ScientificMetrics};

#[derive(Debug, Clone, Serialize)]
pub struct SatelliteReport {
    pub platform: Platform,
    pub analysis_date: NaiveDate,
    pub indices: IndexSet,
    pub comprehensive_index: ComprehensiveIndex,
    pub risk: RiskAssessmentResult,
    pub environmental_impact: EnvironmentalImpact,
    pub outlook: BloomOutlook,
    pub forecast: GrowthForecast,
    pub progression: Vec<ProgressionPoint>,
    pub mitigation: MitigationPlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub width: u32,
    pub height: u32,
    pub analysis_date: NaiveDate,
    pub detection: DetectionResult,
    pub rgb_indices: RgbIndices,
    pub risk: RiskAssessmentResult,
    pub environmental_impact: EnvironmentalImpact,
    pub outlook: BloomOutlook,
    pub mitigation: MitigationPlan,
}

/// Either kind of report, as produced by a batch run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Report {
    Satellite(SatelliteReport),
    Image(ImageReport),
}

impl Report {
    pub fn risk(&self) -> &RiskAssessmentResult {
        match self {
            Report::Satellite(r) => &r.risk,
            Report::Image(r) => &r.risk,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk().risk_level
    }

    pub fn forecast(&self) -> Option<&GrowthForecast> {
        match self {
            Report::Satellite(r) => Some(&r.forecast),
            Report::Image(_) => None,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Report::Satellite(_) => "satellite",
            Report::Image(_) => "image",
        }
    }
}

/// Analyse a measurement in the context of its own acquisition metadata
pub fn analyze_measurement(
    measurement: &SpectralMeasurement,
    history: &[HistoricalRecord],
    config: &Config,
) -> Result<SatelliteReport> {
    let context = AssessmentContext::from_metadata(measurement.metadata());
    analyze_measurement_with_context(measurement, history, config, &context)
}

pub fn analyze_measurement_with_context(
    measurement: &SpectralMeasurement,
    history: &[HistoricalRecord],
    config: &Config,
    context: &AssessmentContext,
) -> Result<SatelliteReport> {
    if measurement.is_empty() {
        return Err(AlgaeRiskError::DataUnavailable(format!(
            "{} measurement carries no band values",
            measurement.platform()
        )));
    }

    let context = &context.with_platform(measurement.platform());
    let calculator = IndexCalculator::new();
    let indices = calculator.calculate_all(measurement);
    let comprehensive_index = calculator.comprehensive_index(measurement);
    log::debug!(
        "{} of 5 indices available for {} measurement",
        indices.available_count(),
        measurement.platform()
    );

    let assessor = RiskAssessor::new(config.risk.clone());
    let risk = assessor.assess(&indices, context);
    let outlook = assessor.bloom_outlook(&risk, config.forecast.horizon_days);

    let chlorophyll = indices
        .get(IndexKind::ChlorophyllA)
        .available
        .then(|| indices.value(IndexKind::ChlorophyllA));
    let environmental_impact =
        ScientificMetrics::new().environmental_impact(&risk, chlorophyll, config.environment.water_temperature_c);

    let predictor = GrowthPredictor::from_history(config.forecast.clone(), config.waterbody.clone(), history);
    let conditions = GrowthConditions::from_assessment(&risk, chlorophyll, context.analysis_date);
    let forecast = predictor.forecast(&conditions, history);
    let progression = predictor.progression(&conditions, config.forecast.progression_days);

    log::info!(
        "{} measurement: risk {:.3} ({}), forecast {} ({:?} growth, {} estimator)",
        measurement.platform(),
        risk.risk_score,
        risk.risk_level,
        forecast.risk_category,
        forecast.growth_model,
        forecast.estimator
    );

    let mitigation = MitigationPlan::for_level(risk.risk_level);

    Ok(SatelliteReport {
        platform: measurement.platform(),
        analysis_date: context.analysis_date,
        indices,
        comprehensive_index,
        risk,
        environmental_impact,
        outlook,
        forecast,
        progression,
        mitigation,
    })
}

/// Analyse a waterbody photograph
pub fn analyze_image(image: &RgbImage, config: &Config) -> Result<ImageReport> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AlgaeRiskError::DataUnavailable("image has no pixels".to_string()));
    }

    let detector = ImageAlgaeDetector::new(config.detection.clone());
    let detection = detector.detect(image);
    let rgb_indices = IndexCalculator::new().from_rgb(image);

    let assessor = RiskAssessor::new(config.risk.clone());
    let risk = assessor.assess_from_image(&detection, &rgb_indices);
    let outlook = assessor.bloom_outlook(&risk, config.forecast.horizon_days);

    let chlorophyll = detection
        .quality_metrics
        .map(|q| q.estimated_chlorophyll)
        .unwrap_or(rgb_indices.chlorophyll_a);
    let environmental_impact =
        ScientificMetrics::new().environmental_impact(&risk, Some(chlorophyll), config.environment.water_temperature_c);

    log::info!(
        "{}x{} image: {:.1}% coverage via {:?}, risk {:.3} ({})",
        width,
        height,
        detection.coverage.total_coverage,
        detection.method,
        risk.risk_score,
        risk.risk_level
    );

    let mitigation = MitigationPlan::for_level(risk.risk_level);

    Ok(ImageReport {
        width,
        height,
        analysis_date: Utc::now().date_naive(),
        detection,
        rgb_indices,
        risk,
        environmental_impact,
        outlook,
        mitigation,
    })
}

/// Colour overlay of the detected families; `None` when nothing was segmented
pub fn render_overlay(image: &RgbImage, report: &ImageReport, config: &Config) -> Option<RgbImage> {
    if report.detection.masks.is_empty() {
        return None;
    }
    let detector = ImageAlgaeDetector::new(config.detection.clone());
    Some(detector.overlay(image, &report.detection.masks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::MeasurementMetadata;
    use image::Rgb;

    fn summer_context() -> AssessmentContext {
        AssessmentContext::new(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(), 10.0)
    }

    #[test]
    fn empty_measurement_is_data_unavailable() {
        let measurement = SpectralMeasurement::from_pairs(
            Vec::<(String, f64)>::new(),
            MeasurementMetadata::new(Platform::Sentinel2),
        );
        let result = analyze_measurement(&measurement, &[], &Config::default());
        assert!(matches!(result, Err(AlgaeRiskError::DataUnavailable(_))));
    }

    #[test]
    fn sentinel_measurement_produces_full_report() {
        let measurement = SpectralMeasurement::from_pairs(
            [("B4", 0.05), ("B8", 0.35), ("B3", 0.08), ("B2", 0.06), ("B5", 0.04), ("B11", 0.02)],
            MeasurementMetadata::new(Platform::Sentinel2),
        );
        let config = Config::default();
        let report = analyze_measurement_with_context(&measurement, &[], &config, &summer_context()).unwrap();

        assert_eq!(report.indices.ndvi.interpretation, "Dense vegetation/algae");
        assert!(report.risk.risk_score >= 0.0 && report.risk.risk_score <= 1.0);
        assert_eq!(report.progression.len(), config.forecast.progression_days as usize);
        assert_eq!(report.forecast.horizon_days, config.forecast.horizon_days);
        assert_eq!(report.mitigation.risk_level, report.risk.risk_level);
        let conditions = report.risk.environmental_conditions.as_ref().unwrap();
        assert_eq!(conditions.satellite_platform, Some(Platform::Sentinel2));

        let json = serde_json::to_string(&Report::Satellite(report)).unwrap();
        assert!(json.contains("\"source\":\"satellite\""));
    }

    #[test]
    fn green_image_report() {
        let image = RgbImage::from_pixel(20, 20, Rgb([40, 160, 40]));
        let config = Config::default();
        let report = analyze_image(&image, &config).unwrap();

        assert!(report.risk.image_based);
        assert!(report.detection.coverage.total_coverage > 0.0);
        assert!(report.risk.confidence >= 20.0);
        assert!(render_overlay(&image, &report, &config).is_some());
    }

    #[test]
    fn empty_image_is_data_unavailable() {
        let result = analyze_image(&RgbImage::new(0, 0), &Config::default());
        assert!(matches!(result, Err(AlgaeRiskError::DataUnavailable(_))));
    }
}
