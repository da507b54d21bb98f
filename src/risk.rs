// src/risk.rs - Weighted multi-factor bloom risk scoring

use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::detection::DetectionResult;
use crate::indices::{IndexKind, IndexSet, RgbIndices};
use crate::measurement::{MeasurementMetadata, Platform};
use crate::scientific::ScientificMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Minimal => "Minimal",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(name)
    }
}

/// Calendar and acquisition context the seasonal adjustment is evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssessmentContext {
    /// Month of the assessment, 1-12
    pub month: u32,
    pub cloud_cover_percent: f64,
    pub analysis_date: NaiveDate,
    /// Platform that acquired the measurement, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl AssessmentContext {
    pub fn new(analysis_date: NaiveDate, cloud_cover_percent: f64) -> Self {
        Self {
            month: analysis_date.month(),
            cloud_cover_percent,
            analysis_date,
            platform: None,
        }
    }

    /// Context for today's date with the default 20% cloud cover
    pub fn now() -> Self {
        Self::new(Utc::now().date_naive(), 20.0)
    }

    /// Context taken from a measurement's acquisition metadata; falls back to today
    pub fn from_metadata(metadata: &MeasurementMetadata) -> Self {
        let date = metadata
            .acquired_at
            .map(|t| t.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive());
        Self::new(date, metadata.cloud_cover_percent).with_platform(metadata.platform)
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Override the month used for seasonal weighting
    pub fn with_month(mut self, month: u32) -> Self {
        self.month = month;
        self
    }
}

/// Per-factor sub-scores of a spectral assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRisks {
    pub chlorophyll: f64,
    pub turbidity: f64,
    pub floating_algae: f64,
    pub vegetation: f64,
}

/// Sub-scores of a photograph-based assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFactorRisks {
    pub visual_coverage: f64,
    pub water_quality: f64,
    pub detection_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndividualRisks {
    Spectral(FactorRisks),
    Image(ImageFactorRisks),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalRisk {
    #[serde(rename = "High (Summer)")]
    HighSummer,
    #[serde(rename = "Medium (Spring/Fall)")]
    MediumSpringFall,
    #[serde(rename = "Low (Winter)")]
    LowWinter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalConditions {
    pub seasonal_risk: SeasonalRisk,
    pub data_quality: DataQuality,
    pub cloud_cover_percent: f64,
    pub analysis_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentResult {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub algae_coverage_percent: f64,
    pub individual_risks: IndividualRisks,
    pub risk_factors: Vec<String>,
    /// 20-100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_conditions: Option<EnvironmentalConditions>,
    pub image_based: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlookCategory {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Medium,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

/// Short-horizon bloom probability read directly off the current risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomOutlook {
    pub prediction_days: u32,
    pub bloom_probability_percent: u32,
    pub probability_category: OutlookCategory,
    pub predicted_risk_score: f64,
}

/// Combines index or detection outputs into a single weighted risk score
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    config: RiskConfig,
    metrics: ScientificMetrics,
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskAssessor {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            metrics: ScientificMetrics::default(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn chlorophyll_risk(&self, chl_a: f64) -> f64 {
        self.config.chlorophyll.score(chl_a)
    }

    pub fn turbidity_risk(&self, turbidity: f64) -> f64 {
        self.config.turbidity.score(turbidity)
    }

    pub fn fai_risk(&self, fai: f64) -> f64 {
        self.config.fai.score(fai)
    }

    /// High NDVI over water (NDWI > 0) suggests surface algae rather than land vegetation
    pub fn vegetation_risk(&self, ndvi: f64, ndwi: f64) -> f64 {
        if ndwi > 0.0 {
            if ndvi > 0.4 {
                0.8
            } else if ndvi > 0.2 {
                0.4
            } else {
                0.1
            }
        } else {
            (ndvi * 0.2).max(0.0)
        }
    }

    /// Weighted sum of the four sub-scores, before any seasonal adjustment
    pub fn combine(&self, risks: &FactorRisks) -> f64 {
        let w = &self.config.weights;
        risks.chlorophyll * w.chlorophyll
            + risks.floating_algae * w.fai
            + risks.turbidity * w.turbidity
            + risks.vegetation * w.vegetation
    }

    pub fn seasonal_multiplier(&self, month: u32) -> f64 {
        if self.config.peak_season_months.contains(&month) {
            self.config.peak_season_multiplier
        } else if self.config.shoulder_season_months.contains(&month) {
            self.config.shoulder_season_multiplier
        } else {
            self.config.off_season_multiplier
        }
    }

    /// Seasonal and cloud-cover multipliers, clamped to [0, 1]
    pub fn environmental_adjustment(&self, base_score: f64, context: &AssessmentContext) -> f64 {
        let mut adjusted = base_score * self.seasonal_multiplier(context.month);
        if context.cloud_cover_percent > self.config.cloud_cover_limit {
            adjusted *= self.config.cloud_cover_multiplier;
        }
        adjusted.clamp(0.0, 1.0)
    }

    pub fn level(&self, score: f64) -> RiskLevel {
        let levels = &self.config.levels;
        if score >= levels.high {
            RiskLevel::High
        } else if score >= levels.medium {
            RiskLevel::Medium
        } else if score >= levels.low {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    /// Completeness of the five indices (60%) and physical plausibility (40%), as 20-100
    pub fn confidence(&self, indices: &IndexSet) -> f64 {
        let completeness = indices.available_count() as f64 / IndexKind::ALL.len() as f64;
        let chl_a = indices.value(IndexKind::ChlorophyllA);
        let turbidity = indices.value(IndexKind::Turbidity);
        let quality = if chl_a > 200.0 || turbidity > 200.0 { 0.5 } else { 1.0 };
        ((completeness * 0.6 + quality * 0.4) * 100.0).clamp(20.0, 100.0)
    }

    /// Qualitative drivers behind the score; seasonal entries only when a month is known
    pub fn risk_factors(
        &self,
        chl_a: f64,
        turbidity: f64,
        fai: f64,
        ndvi: f64,
        month: Option<u32>,
    ) -> Vec<String> {
        let mut factors = Vec::new();

        if chl_a > self.config.chlorophyll.thresholds[1] {
            factors.push("Elevated chlorophyll-a levels".to_string());
        }
        if turbidity > self.config.turbidity.thresholds[1] {
            factors.push("High water turbidity".to_string());
        }
        if fai > self.config.fai.thresholds[1] {
            factors.push("Significant floating algae presence".to_string());
        }
        if ndvi > 0.3 {
            factors.push("High vegetation index over water".to_string());
        }

        if let Some(month) = month {
            if self.config.peak_season_months.contains(&month) {
                factors.push("Peak algae season (summer/early fall)".to_string());
            }
            if month == 7 || month == 8 {
                factors.push("High temperature conditions".to_string());
            }
        }

        if factors.is_empty() {
            factors.push("No significant risk factors identified".to_string());
        }
        factors
    }

    pub fn environmental_conditions(&self, context: &AssessmentContext) -> EnvironmentalConditions {
        let seasonal_risk = match context.month {
            6..=8 => SeasonalRisk::HighSummer,
            4 | 5 | 9 | 10 => SeasonalRisk::MediumSpringFall,
            _ => SeasonalRisk::LowWinter,
        };

        let cloud = context.cloud_cover_percent;
        let data_quality = if cloud < 10.0 {
            DataQuality::Excellent
        } else if cloud < 30.0 {
            DataQuality::Good
        } else if cloud < 50.0 {
            DataQuality::Fair
        } else {
            DataQuality::Poor
        };

        EnvironmentalConditions {
            seasonal_risk,
            data_quality,
            cloud_cover_percent: cloud,
            analysis_date: context.analysis_date,
            satellite_platform: context.platform,
        }
    }

    /// Assess a satellite index set
    pub fn assess(&self, indices: &IndexSet, context: &AssessmentContext) -> RiskAssessmentResult {
        let chl_a = indices.value(IndexKind::ChlorophyllA);
        let turbidity = indices.value(IndexKind::Turbidity);
        let fai = indices.value(IndexKind::Fai);
        let ndvi = indices.value(IndexKind::Ndvi);
        let ndwi = indices.value(IndexKind::Ndwi);

        let risks = FactorRisks {
            chlorophyll: self.chlorophyll_risk(chl_a),
            turbidity: self.turbidity_risk(turbidity),
            floating_algae: self.fai_risk(fai),
            vegetation: self.vegetation_risk(ndvi, ndwi),
        };

        let combined = self.combine(&risks);
        let risk_score = self.environmental_adjustment(combined, context);

        log::debug!(
            "Risk factors: chl={:.2} turb={:.2} fai={:.2} veg={:.2} -> combined {:.3}, adjusted {:.3}",
            risks.chlorophyll,
            risks.turbidity,
            risks.floating_algae,
            risks.vegetation,
            combined,
            risk_score
        );

        RiskAssessmentResult {
            risk_score,
            risk_level: self.level(risk_score),
            algae_coverage_percent: self.metrics.algae_coverage_combined(fai, ndvi, chl_a),
            individual_risks: IndividualRisks::Spectral(risks),
            risk_factors: self.risk_factors(chl_a, turbidity, fai, ndvi, Some(context.month)),
            confidence: self.confidence(indices),
            environmental_conditions: Some(self.environmental_conditions(context)),
            image_based: false,
        }
    }

    /// Assess a photograph from its detection result; chlorophyll and turbidity come
    /// from the detector's quality metrics, else from the RGB index approximations
    pub fn assess_from_image(&self, detection: &DetectionResult, rgb: &RgbIndices) -> RiskAssessmentResult {
        let coverage = detection.coverage.total_coverage;
        let (chl_a, turbidity) = match &detection.quality_metrics {
            Some(q) => (q.estimated_chlorophyll, q.estimated_turbidity),
            None => (rgb.chlorophyll_a, rgb.turbidity),
        };

        let coverage_risk = (coverage / 50.0).min(1.0);
        let quality_risk = (chl_a / 100.0 + turbidity / 100.0) / 2.0;
        let combined = coverage_risk * 0.6 + quality_risk * 0.4;
        let confidence_factor = detection.detection_confidence / 100.0;
        let risk_score = (combined * confidence_factor).clamp(0.0, 1.0);

        RiskAssessmentResult {
            risk_score,
            risk_level: self.level(risk_score),
            algae_coverage_percent: coverage.clamp(0.0, 100.0),
            individual_risks: IndividualRisks::Image(ImageFactorRisks {
                visual_coverage: coverage_risk,
                water_quality: quality_risk,
                detection_confidence: confidence_factor,
            }),
            risk_factors: self.risk_factors(chl_a, turbidity, 0.0, rgb.ndvi, None),
            confidence: detection.detection_confidence.clamp(20.0, 100.0),
            environmental_conditions: None,
            image_based: true,
        }
    }

    pub fn bloom_outlook(&self, risk: &RiskAssessmentResult, days_ahead: u32) -> BloomOutlook {
        let score = risk.risk_score;
        let (category, percent) = if score > 0.8 {
            (OutlookCategory::VeryHigh, 85)
        } else if score > 0.6 {
            (OutlookCategory::High, 70)
        } else if score > 0.4 {
            (OutlookCategory::Medium, 50)
        } else if score > 0.2 {
            (OutlookCategory::Low, 25)
        } else {
            (OutlookCategory::VeryLow, 10)
        };

        BloomOutlook {
            prediction_days: days_ahead,
            bloom_probability_percent: percent,
            probability_category: category,
            predicted_risk_score: score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indices::IndexResult;
    use assert_approx_eq::assert_approx_eq;

    fn context(month: u32, cloud: f64) -> AssessmentContext {
        let date = NaiveDate::from_ymd_opt(2024, month, 15).unwrap();
        AssessmentContext::new(date, cloud)
    }

    #[test]
    fn weights_sum_to_one() {
        let w = RiskConfig::default().weights;
        assert_approx_eq!(w.sum(), 1.0, 1e-12);
    }

    #[test]
    fn maximal_sub_scores_combine_to_one() {
        let assessor = RiskAssessor::default();
        let max = FactorRisks {
            chlorophyll: 1.0,
            turbidity: 1.0,
            floating_algae: 1.0,
            vegetation: 1.0,
        };
        assert_approx_eq!(assessor.combine(&max), 1.0, 1e-12);
        assert_eq!(assessor.environmental_adjustment(1.0, &context(7, 10.0)), 1.0);
    }

    #[test]
    fn sub_score_tiers() {
        let assessor = RiskAssessor::default();
        assert_eq!(assessor.chlorophyll_risk(4.9), 0.0);
        assert_eq!(assessor.chlorophyll_risk(30.0), 0.8);
        assert_eq!(assessor.turbidity_risk(25.0), 0.4);
        assert_eq!(assessor.turbidity_risk(100.0), 1.0);
        assert_eq!(assessor.fai_risk(0.016), 0.8);
        assert_eq!(assessor.vegetation_risk(0.5, 0.1), 0.8);
        assert_eq!(assessor.vegetation_risk(0.3, 0.1), 0.4);
        assert_eq!(assessor.vegetation_risk(0.0, 0.1), 0.1);
        assert_approx_eq!(assessor.vegetation_risk(0.5, -0.2), 0.1, 1e-12);
        assert_eq!(assessor.vegetation_risk(-0.5, -0.2), 0.0);
    }

    #[test]
    fn seasonal_and_cloud_adjustment() {
        let assessor = RiskAssessor::default();
        assert_approx_eq!(assessor.environmental_adjustment(0.5, &context(7, 10.0)), 0.6, 1e-12);
        assert_approx_eq!(assessor.environmental_adjustment(0.5, &context(5, 10.0)), 0.5, 1e-12);
        assert_approx_eq!(assessor.environmental_adjustment(0.5, &context(1, 10.0)), 0.4, 1e-12);
        assert_approx_eq!(assessor.environmental_adjustment(0.5, &context(1, 60.0)), 0.32, 1e-12);
    }

    #[test]
    fn levels() {
        let assessor = RiskAssessor::default();
        assert_eq!(assessor.level(0.8), RiskLevel::High);
        assert_eq!(assessor.level(0.79), RiskLevel::Medium);
        assert_eq!(assessor.level(0.2), RiskLevel::Low);
        assert_eq!(assessor.level(0.19), RiskLevel::Minimal);
    }

    #[test]
    fn all_zero_indices_are_minimal() {
        let assessor = RiskAssessor::default();
        let indices = IndexSet::from_values(0.0, 0.0, 0.0, 0.0, 0.0);
        let result = assessor.assess(&indices, &context(1, 10.0));
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Minimal);
        assert_eq!(result.algae_coverage_percent, 0.0);
        assert_eq!(result.risk_factors, vec!["No significant risk factors identified"]);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn missing_indices_lower_confidence_not_validity() {
        let assessor = RiskAssessor::default();
        let mut indices = IndexSet::from_values(0.5, 0.2, 40.0, 30.0, 0.02);
        indices.fai = IndexResult::unavailable(IndexKind::Fai, "Not available for MODIS (no SWIR band)");
        let result = assessor.assess(&indices, &context(3, 10.0));
        assert_approx_eq!(result.confidence, 88.0, 1e-9);
        match result.individual_risks {
            IndividualRisks::Spectral(r) => assert_eq!(r.floating_algae, 0.0),
            IndividualRisks::Image(_) => panic!("expected spectral risks"),
        }
    }

    #[test]
    fn summer_bloom_is_high() {
        let assessor = RiskAssessor::default();
        let indices = IndexSet::from_values(0.5, 0.2, 60.0, 60.0, 0.05);
        let result = assessor.assess(&indices, &context(8, 5.0));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.risk_score <= 1.0);
        assert!(result.risk_factors.iter().any(|f| f == "High temperature conditions"));
        let conditions = result.environmental_conditions.unwrap();
        assert_eq!(conditions.seasonal_risk, SeasonalRisk::HighSummer);
        assert_eq!(conditions.data_quality, DataQuality::Excellent);
        assert_eq!(conditions.satellite_platform, None);
    }

    #[test]
    fn conditions_name_the_acquiring_platform() {
        let metadata = MeasurementMetadata::new(Platform::Landsat89).with_cloud_cover(35.0);
        let context = AssessmentContext::from_metadata(&metadata);
        let conditions = RiskAssessor::default().environmental_conditions(&context);
        assert_eq!(conditions.satellite_platform, Some(Platform::Landsat89));
        assert_eq!(conditions.data_quality, DataQuality::Fair);

        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json["satellite_platform"], "Landsat 8/9");
    }

    #[test]
    fn outlook_categories() {
        let assessor = RiskAssessor::default();
        let mut result = assessor.assess(&IndexSet::from_values(0.0, 0.0, 0.0, 0.0, 0.0), &context(1, 10.0));
        assert_eq!(assessor.bloom_outlook(&result, 14).probability_category, OutlookCategory::VeryLow);
        result.risk_score = 0.65;
        let outlook = assessor.bloom_outlook(&result, 14);
        assert_eq!(outlook.probability_category, OutlookCategory::High);
        assert_eq!(outlook.bloom_probability_percent, 70);
    }
}
