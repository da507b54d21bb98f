// src/scientific.rs - Literature-derived water-quality transforms
//
// Carlson (1977) trophic state index, Redfield stoichiometry for oxygen demand,
// Hu (2009) FAI pixel thresholding and WHO/EPA chlorophyll-a usability guidance.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::risk::RiskAssessmentResult;

/// FAI above this marks a pixel as floating algae (Hu, 2009)
pub const FAI_PIXEL_THRESHOLD: f64 = 0.001;

/// Water temperature assumed when none is supplied, °C
pub const DEFAULT_WATER_TEMPERATURE_C: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrophicState {
    Oligotrophic,
    Mesotrophic,
    Eutrophic,
    Hypereutrophic,
}

impl fmt::Display for TrophicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrophicState::Oligotrophic => "oligotrophic",
            TrophicState::Mesotrophic => "mesotrophic",
            TrophicState::Eutrophic => "eutrophic",
            TrophicState::Hypereutrophic => "hypereutrophic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FishMortalityRisk {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for FishMortalityRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FishMortalityRisk::Low => "Low",
            FishMortalityRisk::Medium => "Medium",
            FishMortalityRisk::High => "High",
            FishMortalityRisk::Critical => "Critical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UseCase {
    #[serde(rename = "Drinking Water")]
    DrinkingWater,
    Recreation,
    Agriculture,
    Aquaculture,
}

/// Usability verdict; each use case has its own wording for the caution and unsafe tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsabilityStatus {
    Safe,
    Caution,
    #[serde(rename = "Caution - Treatment Required")]
    CautionTreatmentRequired,
    #[serde(rename = "Caution - Monitor Closely")]
    CautionMonitorClosely,
    Unsafe,
    #[serde(rename = "Unsafe - Fish Kill Risk")]
    UnsafeFishKillRisk,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

/// Coarse severity of a usability verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UsabilityTier {
    Safe,
    Caution,
    Unsafe,
}

impl UsabilityStatus {
    pub fn tier(&self) -> UsabilityTier {
        match self {
            UsabilityStatus::Safe => UsabilityTier::Safe,
            UsabilityStatus::Caution
            | UsabilityStatus::CautionTreatmentRequired
            | UsabilityStatus::CautionMonitorClosely => UsabilityTier::Caution,
            UsabilityStatus::Unsafe
            | UsabilityStatus::UnsafeFishKillRisk
            | UsabilityStatus::NotRecommended => UsabilityTier::Unsafe,
        }
    }
}

/// Guideline for one use case: worse tier when chl-a OR coverage exceeds its limit
struct UsabilityGuideline {
    use_case: UseCase,
    unsafe_limits: (f64, f64),
    caution_limits: (f64, f64),
    unsafe_status: UsabilityStatus,
    caution_status: UsabilityStatus,
}

const USABILITY_GUIDELINES: [UsabilityGuideline; 4] = [
    UsabilityGuideline {
        use_case: UseCase::DrinkingWater,
        unsafe_limits: (30.0, 30.0),
        caution_limits: (10.0, 15.0),
        unsafe_status: UsabilityStatus::Unsafe,
        caution_status: UsabilityStatus::CautionTreatmentRequired,
    },
    UsabilityGuideline {
        use_case: UseCase::Recreation,
        unsafe_limits: (40.0, 35.0),
        caution_limits: (25.0, 20.0),
        unsafe_status: UsabilityStatus::Unsafe,
        caution_status: UsabilityStatus::Caution,
    },
    UsabilityGuideline {
        use_case: UseCase::Agriculture,
        unsafe_limits: (60.0, 50.0),
        caution_limits: (35.0, 30.0),
        unsafe_status: UsabilityStatus::NotRecommended,
        caution_status: UsabilityStatus::Caution,
    },
    UsabilityGuideline {
        use_case: UseCase::Aquaculture,
        unsafe_limits: (30.0, 25.0),
        caution_limits: (15.0, 15.0),
        unsafe_status: UsabilityStatus::UnsafeFishKillRisk,
        caution_status: UsabilityStatus::CautionMonitorClosely,
    },
];

/// Share of the waterbody in each risk band, derived from coverage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    #[serde(rename = "Low Risk")]
    pub low: f64,
    #[serde(rename = "Medium Risk")]
    pub medium: f64,
    #[serde(rename = "High Risk")]
    pub high: f64,
}

impl RiskDistribution {
    pub fn from_coverage(coverage: f64) -> Self {
        Self {
            low: (70.0 - coverage).max(0.0),
            medium: coverage.clamp(20.0, 60.0),
            high: (coverage - 30.0).max(0.0),
        }
    }
}

/// Downstream consequences of a bloom for oxygen, fish and water use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub dissolved_oxygen_reduction_percent: f64,
    pub fish_mortality_risk: FishMortalityRisk,
    pub water_usability: BTreeMap<UseCase, UsabilityStatus>,
    pub trophic_state_index: f64,
    pub trophic_classification: TrophicState,
    pub water_quality_score: f64,
    pub risk_distribution: RiskDistribution,
}

/// Stateless scientific transforms parameterised by literature constants
#[derive(Debug, Clone)]
pub struct ScientificMetrics {
    pub fai_pixel_threshold: f64,
}

impl Default for ScientificMetrics {
    fn default() -> Self {
        Self {
            fai_pixel_threshold: FAI_PIXEL_THRESHOLD,
        }
    }
}

impl ScientificMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carlson TSI from chlorophyll-a: 9.81·ln(chl) + 30.6
    pub fn tsi_carlson(&self, chl_a: f64) -> (f64, TrophicState) {
        if !(chl_a > 0.0) {
            return (0.0, TrophicState::Oligotrophic);
        }

        let tsi = 9.81 * chl_a.ln() + 30.6;
        let classification = if tsi < 40.0 {
            TrophicState::Oligotrophic
        } else if tsi < 50.0 {
            TrophicState::Mesotrophic
        } else if tsi < 70.0 {
            TrophicState::Eutrophic
        } else {
            TrophicState::Hypereutrophic
        };

        (tsi, classification)
    }

    /// 0-10 quality score falling linearly within each trophic band
    pub fn water_quality_score(&self, tsi: f64) -> f64 {
        let score = if tsi < 40.0 {
            10.0 - (tsi / 40.0) * 2.0
        } else if tsi < 50.0 {
            8.0 - ((tsi - 40.0) / 10.0) * 2.0
        } else if tsi < 70.0 {
            6.0 - ((tsi - 50.0) / 20.0) * 3.0
        } else {
            3.0 - ((tsi - 70.0) / 30.0) * 3.0
        };
        score.clamp(0.0, 10.0)
    }

    /// Dissolved-oxygen saturation in mg/L, bounded to 6-10
    pub fn do_saturation(&self, temperature_c: f64) -> f64 {
        (9.1 * (1.0 - 0.02 * (temperature_c - 20.0))).clamp(6.0, 10.0)
    }

    /// Percent of saturated DO consumed by decomposing algae biomass
    pub fn do_reduction(&self, chl_a: f64, temperature_c: f64) -> f64 {
        let saturation = self.do_saturation(temperature_c);
        let carbon_mg_per_l = (chl_a / 1000.0) * 40.0;
        let oxygen_demand_mg_per_l = carbon_mg_per_l * 3.3;
        let reduction = oxygen_demand_mg_per_l / saturation * 100.0;
        if reduction.is_finite() {
            reduction.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn fish_mortality_risk(&self, do_reduction: f64, chl_a: f64) -> FishMortalityRisk {
        if do_reduction > 60.0 || chl_a > 100.0 {
            FishMortalityRisk::Critical
        } else if do_reduction > 40.0 || chl_a > 50.0 {
            FishMortalityRisk::High
        } else if do_reduction > 20.0 || chl_a > 25.0 {
            FishMortalityRisk::Medium
        } else {
            FishMortalityRisk::Low
        }
    }

    /// WHO/EPA-style usability per use case
    pub fn water_usability(&self, chl_a: f64, coverage: f64) -> BTreeMap<UseCase, UsabilityStatus> {
        USABILITY_GUIDELINES
            .iter()
            .map(|g| {
                let status = if chl_a > g.unsafe_limits.0 || coverage > g.unsafe_limits.1 {
                    g.unsafe_status
                } else if chl_a > g.caution_limits.0 || coverage > g.caution_limits.1 {
                    g.caution_status
                } else {
                    UsabilityStatus::Safe
                };
                (g.use_case, status)
            })
            .collect()
    }

    /// Pixel-count coverage: share of pixels whose FAI exceeds the threshold
    pub fn coverage_from_fai_pixels(&self, fai_values: &[f64], total_pixels: usize) -> f64 {
        if fai_values.is_empty() || total_pixels == 0 {
            return 0.0;
        }
        let algae_pixels = fai_values
            .iter()
            .filter(|&&v| v > self.fai_pixel_threshold)
            .count();
        (algae_pixels as f64 / total_pixels as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Coverage estimate from mean index values.
    ///
    /// Chlorophyll-a drives a five-tier piecewise-linear table. The FAI and NDVI
    /// bonuses are an inland-water approximation of per-pixel FAI thresholding,
    /// which needs pixel data this function does not have.
    pub fn algae_coverage_combined(&self, fai: f64, ndvi: f64, chl_a: f64) -> f64 {
        let chl_coverage = if chl_a < 3.0 {
            0.0
        } else if chl_a < 10.0 {
            5.0 + (chl_a - 3.0) * 2.0
        } else if chl_a < 30.0 {
            20.0 + (chl_a - 10.0) * 1.5
        } else if chl_a < 100.0 {
            50.0 + (chl_a - 30.0) * 0.5
        } else {
            85.0 + ((chl_a - 100.0) * 0.1).min(15.0)
        };

        let fai_bonus = if fai > 0.15 {
            10.0
        } else if fai > 0.10 {
            5.0
        } else if fai > 0.05 {
            2.0
        } else {
            0.0
        };

        let ndvi_bonus = if ndvi > 0.4 {
            5.0
        } else if ndvi > 0.2 {
            2.0
        } else {
            0.0
        };

        (chl_coverage + fai_bonus + ndvi_bonus).clamp(0.0, 100.0)
    }

    /// Assemble the environmental impact of an assessment; without a measured
    /// chlorophyll-a value, half the coverage is used as a proxy
    pub fn environmental_impact(
        &self,
        risk: &RiskAssessmentResult,
        chl_a: Option<f64>,
        temperature_c: f64,
    ) -> EnvironmentalImpact {
        let coverage = risk.algae_coverage_percent;
        let chl_a = chl_a.unwrap_or(coverage * 0.5);

        let (tsi, trophic) = self.tsi_carlson(chl_a);
        let do_reduction = self.do_reduction(chl_a, temperature_c);

        EnvironmentalImpact {
            dissolved_oxygen_reduction_percent: do_reduction,
            fish_mortality_risk: self.fish_mortality_risk(do_reduction, chl_a),
            water_usability: self.water_usability(chl_a, coverage),
            trophic_state_index: tsi,
            trophic_classification: trophic,
            water_quality_score: self.water_quality_score(tsi),
            risk_distribution: RiskDistribution::from_coverage(coverage),
        }
    }
}
