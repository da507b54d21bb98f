// src/lib.rs - Library interface for algae_risk

pub mod config;
pub mod detection;
pub mod errors;
pub mod forecast;
pub mod history;
pub mod image_io;
pub mod image_utils;
pub mod indices;
pub mod measurement;
pub mod mitigation;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod risk;
pub mod scientific;
pub mod shape_analysis;
pub mod waterbody;

// Re-export commonly used types and functions
pub use errors::{AlgaeRiskError, Result};
pub use config::Config;
pub use pipeline::{analyze_image, analyze_measurement, analyze_measurement_with_context, ImageReport, Report, SatelliteReport};
pub use image_io::{collect_inputs, load_image, load_measurement, save_image, InputFile, InputKind};

pub use measurement::{MeasurementMetadata, Platform, SpectralMeasurement};
pub use indices::{IndexCalculator, IndexKind, IndexResult, IndexSet, RgbIndices};
pub use scientific::{EnvironmentalImpact, FishMortalityRisk, ScientificMetrics, TrophicState};
pub use risk::{AssessmentContext, RiskAssessmentResult, RiskAssessor, RiskLevel};
pub use detection::{DetectionResult, ImageAlgaeDetector};
pub use forecast::{
    BloomEstimator,
    ForecastRiskCategory,
    GrowthConditions,
    GrowthForecast,
    GrowthPredictor,
    HeuristicEstimator,
    TrainedEstimator,
    TrainingSummary,
    TrendDirection,
};
pub use history::{HistoricalRecord, load_history_csv};
pub use waterbody::WaterbodyProfile;
