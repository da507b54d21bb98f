// src/config.rs - TOML configuration for risk scoring, forecasting and image detection

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AlgaeRiskError, Result};
use crate::image_utils::HsvRange;
use crate::waterbody::WaterbodyProfile;

/// Configuration for the algae risk toolkit
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default = "default_write_overlays")]
    pub write_overlays: bool,

    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub waterbody: WaterbodyProfile,

    #[serde(default)]
    pub environment: EnvironmentConfig,
}

/// Four ascending ">=" thresholds with the sub-score reached at each
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct TierTable {
    pub thresholds: [f64; 4],
    pub scores: [f64; 4],
}

impl TierTable {
    pub const fn new(thresholds: [f64; 4], scores: [f64; 4]) -> Self {
        Self { thresholds, scores }
    }

    /// Score of the highest tier whose threshold the value reaches; 0.0 below the first
    pub fn score(&self, value: f64) -> f64 {
        self.thresholds
            .iter()
            .zip(self.scores.iter())
            .rev()
            .find(|(threshold, _)| value >= **threshold)
            .map(|(_, score)| *score)
            .unwrap_or(0.0)
    }

    fn is_ascending(&self) -> bool {
        self.thresholds.windows(2).all(|w| w[0] < w[1])
    }

    fn scores_in_unit_range(&self) -> bool {
        self.scores.iter().all(|s| (0.0..=1.0).contains(s))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RiskWeights {
    pub chlorophyll: f64,
    pub fai: f64,
    pub turbidity: f64,
    pub vegetation: f64,
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.chlorophyll + self.fai + self.turbidity + self.vegetation
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            chlorophyll: 0.35,
            fai: 0.25,
            turbidity: 0.20,
            vegetation: 0.20,
        }
    }
}

/// Minimum scores for the High, Medium and Low levels
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct LevelThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
            low: 0.2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RiskConfig {
    /// μg/L
    pub chlorophyll: TierTable,
    /// NTU
    pub turbidity: TierTable,
    pub fai: TierTable,
    pub weights: RiskWeights,
    pub levels: LevelThresholds,
    pub peak_season_months: Vec<u32>,
    pub peak_season_multiplier: f64,
    pub shoulder_season_months: Vec<u32>,
    pub shoulder_season_multiplier: f64,
    pub off_season_multiplier: f64,
    /// Cloud cover (%) above which the score is penalised
    pub cloud_cover_limit: f64,
    pub cloud_cover_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            chlorophyll: TierTable::new([5.0, 15.0, 30.0, 50.0], [0.2, 0.5, 0.8, 1.0]),
            turbidity: TierTable::new([10.0, 25.0, 50.0, 100.0], [0.1, 0.4, 0.7, 1.0]),
            fai: TierTable::new([0.001, 0.005, 0.015, 0.030], [0.2, 0.5, 0.8, 1.0]),
            weights: RiskWeights::default(),
            levels: LevelThresholds::default(),
            peak_season_months: vec![6, 7, 8, 9],
            peak_season_multiplier: 1.2,
            shoulder_season_months: vec![4, 5, 10],
            shoulder_season_multiplier: 1.0,
            off_season_multiplier: 0.8,
            cloud_cover_limit: 50.0,
            cloud_cover_multiplier: 0.8,
        }
    }
}

/// Daily growth rate (%/day) by current chlorophyll-a, ">" thresholds ascending
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GrowthTiers {
    pub thresholds: [f64; 3],
    pub rates: [f64; 3],
    pub base_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for GrowthTiers {
    fn default() -> Self {
        Self {
            thresholds: [5.0, 15.0, 30.0],
            rates: [0.2, 0.5, 0.8],
            base_rate: 0.05,
            min_rate: -0.5,
            max_rate: 2.0,
        }
    }
}

impl GrowthTiers {
    pub fn rate_for(&self, chl_a: f64) -> f64 {
        self.thresholds
            .iter()
            .zip(self.rates.iter())
            .rev()
            .find(|(threshold, _)| chl_a > **threshold)
            .map(|(_, rate)| *rate)
            .unwrap_or(self.base_rate)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon_days: u32,
    pub progression_days: u32,
    /// Monthly points required before trend mode is used
    pub min_trend_points: usize,
    pub growth: GrowthTiers,
    /// Standard deviation of the Gaussian growth-rate perturbation (%/day)
    pub noise_std: f64,
    /// Perturbation is truncated to ± this many standard deviations
    pub noise_bound_sigma: f64,
    /// Seed for the perturbation RNG; `None` draws from entropy
    pub seed: Option<u64>,
    pub min_training_samples: usize,
    pub synthetic_seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            progression_days: 30,
            min_trend_points: 6,
            growth: GrowthTiers::default(),
            noise_std: 0.05,
            noise_bound_sigma: 3.0,
            seed: Some(42),
            min_training_samples: 20,
            synthetic_seed: 42,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DetectionConfig {
    pub enable_segmentation: bool,
    pub green_range: HsvRange,
    pub blue_green_range: HsvRange,
    pub brown_range: HsvRange,
    pub kernel_size: u32,
    pub median_radius: u32,
    pub blur_sigma: f32,
    /// Weight of the original pixel when blending the overlay
    pub overlay_alpha: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enable_segmentation: true,
            green_range: HsvRange::new([40, 50, 50], [80, 255, 255]),
            blue_green_range: HsvRange::new([80, 50, 50], [130, 255, 255]),
            brown_range: HsvRange::new([10, 50, 20], [30, 200, 150]),
            kernel_size: 3,
            median_radius: 2,
            blur_sigma: 1.1,
            overlay_alpha: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Water temperature used for dissolved-oxygen estimates, °C
    pub water_temperature_c: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            water_temperature_c: 25.0,
        }
    }
}

fn default_input_path() -> String {
    "./input".to_string()
}

fn default_output_base_dir() -> String {
    "./output".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_write_overlays() -> bool {
    true
}

fn check_months(name: &str, months: &[u32]) -> Result<()> {
    if let Some(m) = months.iter().find(|m| !(1..=12).contains(*m)) {
        return Err(AlgaeRiskError::Config(format!(
            "{} contains invalid month {}",
            name, m
        )));
    }
    Ok(())
}

fn check_tier_table(name: &str, table: &TierTable) -> Result<()> {
    if !table.is_ascending() {
        return Err(AlgaeRiskError::Config(format!(
            "{} thresholds must be strictly ascending",
            name
        )));
    }
    if !table.scores_in_unit_range() {
        return Err(AlgaeRiskError::Config(format!(
            "{} scores must lie in [0, 1]",
            name
        )));
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            write_overlays: default_write_overlays(),
            risk: RiskConfig::default(),
            forecast: ForecastConfig::default(),
            detection: DetectionConfig::default(),
            waterbody: WaterbodyProfile::default(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AlgaeRiskError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            AlgaeRiskError::ConfigLoad { source, .. } => AlgaeRiskError::ConfigLoad {
                source,
                path: path.to_path_buf(),
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| AlgaeRiskError::ConfigLoad {
            source,
            path: PathBuf::new(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk;

        let weight_sum = risk.weights.sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(AlgaeRiskError::Config(format!(
                "risk weights must sum to 1.0 (got {:.6})",
                weight_sum
            )));
        }

        check_tier_table("risk.chlorophyll", &risk.chlorophyll)?;
        check_tier_table("risk.turbidity", &risk.turbidity)?;
        check_tier_table("risk.fai", &risk.fai)?;

        let levels = &risk.levels;
        if !(0.0 < levels.low && levels.low < levels.medium && levels.medium < levels.high && levels.high <= 1.0) {
            return Err(AlgaeRiskError::Config(
                "risk.levels must satisfy 0 < low < medium < high <= 1".to_string(),
            ));
        }

        check_months("risk.peak_season_months", &risk.peak_season_months)?;
        check_months("risk.shoulder_season_months", &risk.shoulder_season_months)?;

        if risk.cloud_cover_multiplier < 0.0 || risk.off_season_multiplier < 0.0 {
            return Err(AlgaeRiskError::Config(
                "risk multipliers must be non-negative".to_string(),
            ));
        }

        let forecast = &self.forecast;
        if forecast.horizon_days == 0 {
            return Err(AlgaeRiskError::Config(
                "forecast.horizon_days must be > 0".to_string(),
            ));
        }

        if forecast.progression_days == 0 {
            return Err(AlgaeRiskError::Config(
                "forecast.progression_days must be > 0".to_string(),
            ));
        }

        if forecast.min_trend_points < 2 {
            return Err(AlgaeRiskError::Config(
                "forecast.min_trend_points must be >= 2".to_string(),
            ));
        }

        if forecast.noise_std < 0.0 || forecast.noise_bound_sigma < 0.0 {
            return Err(AlgaeRiskError::Config(
                "forecast noise parameters must be non-negative".to_string(),
            ));
        }

        let growth = &forecast.growth;
        if !growth.thresholds.windows(2).all(|w| w[0] < w[1]) {
            return Err(AlgaeRiskError::Config(
                "forecast.growth thresholds must be strictly ascending".to_string(),
            ));
        }

        if growth.min_rate >= growth.max_rate {
            return Err(AlgaeRiskError::Config(
                "forecast.growth.min_rate must be < max_rate".to_string(),
            ));
        }

        let detection = &self.detection;
        for (name, range) in [
            ("green_range", &detection.green_range),
            ("blue_green_range", &detection.blue_green_range),
            ("brown_range", &detection.brown_range),
        ] {
            if range.is_empty() {
                return Err(AlgaeRiskError::Config(format!(
                    "detection.{} has a lower bound above its upper bound",
                    name
                )));
            }
        }

        if detection.kernel_size == 0 {
            return Err(AlgaeRiskError::Config(
                "detection.kernel_size must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&detection.overlay_alpha) {
            return Err(AlgaeRiskError::Config(
                "detection.overlay_alpha must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.waterbody.area_km2 < 0.0 || self.waterbody.depth_m < 0.0 {
            return Err(AlgaeRiskError::Config(
                "waterbody area and depth must be non-negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Create the report and overlay directories under `output_base_dir`
    pub fn prepare_output_dirs(&self) -> Result<()> {
        let base_dir = PathBuf::from(&self.output_base_dir);
        fs::create_dir_all(base_dir.join("reports"))?;
        if self.write_overlays {
            fs::create_dir_all(base_dir.join("overlays"))?;
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            AlgaeRiskError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
