// src/waterbody.rs - Static waterbody characteristics used by the bloom estimators

use std::fmt;

use serde::{Deserialize, Serialize};

/// Historical water-quality grade as issued by the monitoring agency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterQualityGrade {
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    D,
    E,
}

impl WaterQualityGrade {
    /// Ordinal rank, 1 (best) to 9 (worst)
    pub fn rank(&self) -> u8 {
        match self {
            WaterQualityGrade::A => 1,
            WaterQualityGrade::BPlus => 2,
            WaterQualityGrade::B => 3,
            WaterQualityGrade::CPlus => 4,
            WaterQualityGrade::C => 5,
            WaterQualityGrade::CMinus => 6,
            WaterQualityGrade::DPlus => 7,
            WaterQualityGrade::D => 8,
            WaterQualityGrade::E => 9,
        }
    }
}

impl Default for WaterQualityGrade {
    fn default() -> Self {
        WaterQualityGrade::C
    }
}

impl fmt::Display for WaterQualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WaterQualityGrade::A => "A",
            WaterQualityGrade::BPlus => "B+",
            WaterQualityGrade::B => "B",
            WaterQualityGrade::CPlus => "C+",
            WaterQualityGrade::C => "C",
            WaterQualityGrade::CMinus => "C-",
            WaterQualityGrade::DPlus => "D+",
            WaterQualityGrade::D => "D",
            WaterQualityGrade::E => "E",
        };
        f.write_str(label)
    }
}

fn default_name() -> String {
    "Unnamed waterbody".to_string()
}

fn default_area_km2() -> f64 {
    10.0
}

fn default_depth_m() -> f64 {
    5.0
}

fn default_history_years() -> u32 {
    3
}

/// Physical and historical profile of one waterbody
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterbodyProfile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_area_km2")]
    pub area_km2: f64,
    #[serde(default = "default_depth_m")]
    pub depth_m: f64,
    #[serde(default)]
    pub pollution_source_count: u32,
    #[serde(default)]
    pub water_quality_grade: WaterQualityGrade,
    /// Number of recorded bloom years within `history_years`
    #[serde(default)]
    pub historical_bloom_count: u32,
    #[serde(default = "default_history_years")]
    pub history_years: u32,
}

impl Default for WaterbodyProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            area_km2: default_area_km2(),
            depth_m: default_depth_m(),
            pollution_source_count: 0,
            water_quality_grade: WaterQualityGrade::default(),
            historical_bloom_count: 0,
            history_years: default_history_years(),
        }
    }
}

impl WaterbodyProfile {
    /// Blooms per year of record
    pub fn bloom_frequency(&self) -> f64 {
        self.historical_bloom_count as f64 / self.history_years.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_ranks_follow_agency_order() {
        assert_eq!(WaterQualityGrade::A.rank(), 1);
        assert_eq!(WaterQualityGrade::CMinus.rank(), 6);
        assert_eq!(WaterQualityGrade::E.rank(), 9);
        let parsed: WaterQualityGrade = serde_json::from_str("\"D+\"").unwrap();
        assert_eq!(parsed, WaterQualityGrade::DPlus);
    }

    #[test]
    fn bloom_frequency_guards_zero_years() {
        let profile = WaterbodyProfile {
            historical_bloom_count: 2,
            history_years: 0,
            ..WaterbodyProfile::default()
        };
        assert_eq!(profile.bloom_frequency(), 2.0);
        assert_eq!(WaterbodyProfile::default().bloom_frequency(), 0.0);
    }
}
