// src/indices.rs - Spectral index calculation from band reflectances or RGB photographs

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::image_utils::channel_means;
use crate::measurement::{ChlorophyllRatio, SpectralMeasurement};

/// The five indices the risk model consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "NDWI")]
    Ndwi,
    #[serde(rename = "Chlorophyll-a")]
    ChlorophyllA,
    #[serde(rename = "Turbidity")]
    Turbidity,
    #[serde(rename = "FAI (Floating Algae Index)")]
    Fai,
}

impl IndexKind {
    pub const ALL: [IndexKind; 5] = [
        IndexKind::Ndvi,
        IndexKind::Ndwi,
        IndexKind::ChlorophyllA,
        IndexKind::Turbidity,
        IndexKind::Fai,
    ];

    pub fn unit(&self) -> IndexUnit {
        match self {
            IndexKind::ChlorophyllA => IndexUnit::MicrogramsPerLitre,
            IndexKind::Turbidity => IndexUnit::Ntu,
            _ => IndexUnit::Dimensionless,
        }
    }

    /// Documented valid range; FAI is an unbounded reflectance difference
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        match self {
            IndexKind::Ndvi | IndexKind::Ndwi => Some((-1.0, 1.0)),
            IndexKind::ChlorophyllA => Some((0.0, 200.0)),
            IndexKind::Turbidity => Some((0.0, 100.0)),
            IndexKind::Fai => None,
        }
    }

    pub fn labels(&self) -> &'static InterpretationTable {
        match self {
            IndexKind::Ndvi => &NDVI_LABELS,
            IndexKind::Ndwi => &NDWI_LABELS,
            IndexKind::ChlorophyllA => &CHLOROPHYLL_LABELS,
            IndexKind::Turbidity => &TURBIDITY_LABELS,
            IndexKind::Fai => &FAI_LABELS,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ndwi => "NDWI",
            IndexKind::ChlorophyllA => "Chlorophyll-a",
            IndexKind::Turbidity => "Turbidity",
            IndexKind::Fai => "FAI (Floating Algae Index)",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexUnit {
    #[serde(rename = "")]
    Dimensionless,
    #[serde(rename = "μg/L")]
    MicrogramsPerLitre,
    #[serde(rename = "NTU")]
    Ntu,
}

impl fmt::Display for IndexUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            IndexUnit::Dimensionless => "",
            IndexUnit::MicrogramsPerLitre => "μg/L",
            IndexUnit::Ntu => "NTU",
        };
        f.write_str(unit)
    }
}

/// Ordered "greater than" threshold table mapping a value to a qualitative label
#[derive(Debug)]
pub struct InterpretationTable {
    steps: &'static [(f64, &'static str)],
    floor: &'static str,
}

impl InterpretationTable {
    pub fn label(&self, value: f64) -> &'static str {
        self.steps
            .iter()
            .find(|(threshold, _)| value > *threshold)
            .map(|(_, label)| *label)
            .unwrap_or(self.floor)
    }
}

pub static NDVI_LABELS: InterpretationTable = InterpretationTable {
    steps: &[
        (0.6, "Dense vegetation/algae"),
        (0.3, "Moderate vegetation/algae"),
        (0.1, "Sparse vegetation"),
        (-0.1, "Non-vegetated/water"),
    ],
    floor: "Water/bare soil",
};

pub static NDWI_LABELS: InterpretationTable = InterpretationTable {
    steps: &[
        (0.3, "Open water"),
        (0.0, "Water/wet soil"),
        (-0.3, "Dry soil/vegetation"),
    ],
    floor: "Built-up/bare soil",
};

pub static CHLOROPHYLL_LABELS: InterpretationTable = InterpretationTable {
    steps: &[
        (30.0, "Very high - severe algal bloom"),
        (15.0, "High - algal bloom present"),
        (8.0, "Moderate - elevated algae"),
        (3.0, "Low-moderate - normal levels"),
    ],
    floor: "Low - oligotrophic conditions",
};

pub static TURBIDITY_LABELS: InterpretationTable = InterpretationTable {
    steps: &[
        (40.0, "Very high - heavily polluted"),
        (20.0, "High - polluted"),
        (10.0, "Moderate - slightly turbid"),
        (4.0, "Low - clear water"),
    ],
    floor: "Very low - very clear",
};

pub static FAI_LABELS: InterpretationTable = InterpretationTable {
    steps: &[
        (0.015, "Dense floating algae"),
        (0.005, "Moderate floating algae"),
        (0.0, "Light algae presence"),
    ],
    floor: "No significant floating algae",
};

/// One computed index: clamped mean, unit and qualitative label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub kind: IndexKind,
    pub mean: f64,
    pub unit: IndexUnit,
    pub interpretation: String,
    /// False when the platform or the delivered band set could not support the index
    pub available: bool,
}

impl IndexResult {
    /// Clamp a raw value to the index's valid range and attach its interpretation
    pub fn new(kind: IndexKind, raw: f64) -> Self {
        let raw = if raw.is_finite() { raw } else { 0.0 };
        let mean = match kind.valid_range() {
            Some((lo, hi)) => raw.clamp(lo, hi),
            None => raw,
        };
        Self {
            kind,
            mean,
            unit: kind.unit(),
            interpretation: kind.labels().label(mean).to_string(),
            available: true,
        }
    }

    /// Zero-valued placeholder carrying the reason the index could not be computed
    pub fn unavailable(kind: IndexKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            mean: 0.0,
            unit: kind.unit(),
            interpretation: reason.into(),
            available: false,
        }
    }

    /// Mean value, or zero when unavailable
    pub fn value(&self) -> f64 {
        if self.available {
            self.mean
        } else {
            0.0
        }
    }
}

/// The full set of indices for one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    pub ndvi: IndexResult,
    pub ndwi: IndexResult,
    pub chlorophyll_a: IndexResult,
    pub turbidity: IndexResult,
    pub fai: IndexResult,
}

impl IndexSet {
    /// Build a fully available set from plain values (clamped and interpreted)
    pub fn from_values(ndvi: f64, ndwi: f64, chlorophyll_a: f64, turbidity: f64, fai: f64) -> Self {
        Self {
            ndvi: IndexResult::new(IndexKind::Ndvi, ndvi),
            ndwi: IndexResult::new(IndexKind::Ndwi, ndwi),
            chlorophyll_a: IndexResult::new(IndexKind::ChlorophyllA, chlorophyll_a),
            turbidity: IndexResult::new(IndexKind::Turbidity, turbidity),
            fai: IndexResult::new(IndexKind::Fai, fai),
        }
    }

    /// Set with every index marked unavailable
    pub fn unavailable(reason: &str) -> Self {
        Self {
            ndvi: IndexResult::unavailable(IndexKind::Ndvi, reason),
            ndwi: IndexResult::unavailable(IndexKind::Ndwi, reason),
            chlorophyll_a: IndexResult::unavailable(IndexKind::ChlorophyllA, reason),
            turbidity: IndexResult::unavailable(IndexKind::Turbidity, reason),
            fai: IndexResult::unavailable(IndexKind::Fai, reason),
        }
    }

    pub fn get(&self, kind: IndexKind) -> &IndexResult {
        match kind {
            IndexKind::Ndvi => &self.ndvi,
            IndexKind::Ndwi => &self.ndwi,
            IndexKind::ChlorophyllA => &self.chlorophyll_a,
            IndexKind::Turbidity => &self.turbidity,
            IndexKind::Fai => &self.fai,
        }
    }

    pub fn value(&self, kind: IndexKind) -> f64 {
        self.get(kind).value()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexResult> {
        IndexKind::ALL.into_iter().map(move |kind| self.get(kind))
    }

    pub fn available_count(&self) -> usize {
        self.iter().filter(|r| r.available).count()
    }
}

/// Coarse indices estimated from an RGB photograph.
///
/// These use the green channel as a NIR proxy and mean channel intensities,
/// so they are lower fidelity than the satellite formulas and must not be
/// compared with them directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbIndices {
    pub ndvi: f64,
    pub chlorophyll_a: f64,
    pub turbidity: f64,
}

/// Overall water-quality category of the composite index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityCategory {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
}

impl QualityCategory {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            QualityCategory::Excellent
        } else if score > 60.0 {
            QualityCategory::Good
        } else if score > 40.0 {
            QualityCategory::Fair
        } else if score > 20.0 {
            QualityCategory::Poor
        } else {
            QualityCategory::VeryPoor
        }
    }
}

/// Composite 0-100 water-quality index with management hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveIndex {
    pub indices: IndexSet,
    pub composite_score: f64,
    pub quality_category: QualityCategory,
    pub recommendations: Vec<String>,
}

/// Converts band reflectances (or RGB statistics) into named spectral indices
#[derive(Debug, Clone, Default)]
pub struct IndexCalculator;

fn normalized_difference(a: f64, b: f64) -> f64 {
    let denominator = a + b;
    if denominator == 0.0 {
        return 0.0;
    }
    ((a - b) / denominator).clamp(-1.0, 1.0)
}

/// Scaled integer products (e.g. 0-10000) are brought back to 0-1 reflectance
fn to_reflectance(value: f64, scale: f64) -> f64 {
    if value > 1.0 {
        value / scale
    } else {
        value
    }
}

fn missing_bands_message(missing: &[&str]) -> String {
    format!("Missing bands: {}", missing.join(", "))
}

/// Fetch every named band or report which ones are absent
fn require_bands(
    measurement: &SpectralMeasurement,
    names: &[&'static str],
) -> std::result::Result<Vec<f64>, Vec<&'static str>> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for &name in names {
        match measurement.band(name) {
            Some(v) => values.push(v),
            None => missing.push(name),
        }
    }
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(missing)
    }
}

impl IndexCalculator {
    pub fn new() -> Self {
        Self
    }

    /// NDVI = (NIR - Red) / (NIR + Red)
    pub fn ndvi(&self, measurement: &SpectralMeasurement) -> IndexResult {
        let spec = measurement.platform().spec();
        match require_bands(measurement, &[spec.nir, spec.red]) {
            Ok(v) => IndexResult::new(IndexKind::Ndvi, normalized_difference(v[0], v[1])),
            Err(missing) => IndexResult::unavailable(IndexKind::Ndvi, missing_bands_message(&missing)),
        }
    }

    /// NDWI = (Green - NIR) / (Green + NIR)
    pub fn ndwi(&self, measurement: &SpectralMeasurement) -> IndexResult {
        let spec = measurement.platform().spec();
        match require_bands(measurement, &[spec.green, spec.nir]) {
            Ok(v) => IndexResult::new(IndexKind::Ndwi, normalized_difference(v[0], v[1])),
            Err(missing) => IndexResult::unavailable(IndexKind::Ndwi, missing_bands_message(&missing)),
        }
    }

    /// Chlorophyll-a in μg/L from the platform's empirical band-ratio power law
    pub fn chlorophyll_a(&self, measurement: &SpectralMeasurement) -> IndexResult {
        let spec = measurement.platform().spec();
        let model = spec.chlorophyll;

        let raw = match model.ratio {
            ChlorophyllRatio::RedOverRedEdge => {
                let red = measurement.band(spec.red);
                let red_edge = spec
                    .red_edge
                    .and_then(|name| measurement.band(name))
                    .or_else(|| measurement.band(spec.nir));
                match (red, red_edge) {
                    (Some(red), Some(edge)) => {
                        if edge != 0.0 {
                            model.law.apply(red / edge)
                        } else {
                            0.0
                        }
                    }
                    (None, _) => {
                        return IndexResult::unavailable(
                            IndexKind::ChlorophyllA,
                            missing_bands_message(&[spec.red]),
                        )
                    }
                    (Some(_), None) => {
                        let edge_name = spec.red_edge.unwrap_or(spec.nir);
                        return IndexResult::unavailable(
                            IndexKind::ChlorophyllA,
                            missing_bands_message(&[edge_name, spec.nir]),
                        );
                    }
                }
            }
            ChlorophyllRatio::BlueOverGreen => match require_bands(measurement, &[spec.blue, spec.green]) {
                Ok(v) => {
                    let (blue, green) = (v[0], v[1]);
                    let usable = green != 0.0 && (!model.requires_nonzero_numerator || blue != 0.0);
                    if usable {
                        model.law.apply(blue / green)
                    } else {
                        0.0
                    }
                }
                Err(missing) => {
                    return IndexResult::unavailable(IndexKind::ChlorophyllA, missing_bands_message(&missing))
                }
            },
        };

        IndexResult::new(IndexKind::ChlorophyllA, raw)
    }

    /// Turbidity in NTU from red reflectance
    pub fn turbidity(&self, measurement: &SpectralMeasurement) -> IndexResult {
        let spec = measurement.platform().spec();
        let red = match measurement.band(spec.red) {
            Some(red) => red,
            None => {
                return IndexResult::unavailable(IndexKind::Turbidity, missing_bands_message(&[spec.red]))
            }
        };
        let red = if spec.rescale_turbidity_red {
            to_reflectance(red, spec.reflectance_scale)
        } else {
            red
        };
        IndexResult::new(IndexKind::Turbidity, spec.turbidity.apply(red))
    }

    /// Floating Algae Index by linear baseline interpolation between red and SWIR
    pub fn fai(&self, measurement: &SpectralMeasurement) -> IndexResult {
        let platform = measurement.platform();
        let spec = platform.spec();
        let (wavelengths, swir_band) = match (spec.fai_wavelengths, spec.swir) {
            (Some(w), Some(s)) => (w, s),
            _ => {
                return IndexResult::unavailable(
                    IndexKind::Fai,
                    format!("Not available for {} (no SWIR band)", platform),
                )
            }
        };

        let v = match require_bands(measurement, &[spec.red, spec.nir, swir_band]) {
            Ok(v) => v,
            Err(missing) => return IndexResult::unavailable(IndexKind::Fai, missing_bands_message(&missing)),
        };
        let red = to_reflectance(v[0], spec.reflectance_scale);
        let nir = to_reflectance(v[1], spec.reflectance_scale);
        let swir = to_reflectance(v[2], spec.reflectance_scale);

        let span = wavelengths.swir - wavelengths.red;
        let fai = if span != 0.0 {
            let baseline = red + (swir - red) * (wavelengths.nir - wavelengths.red) / span;
            log::debug!(
                "FAI: red={:.4}, nir={:.4}, swir={:.4}, baseline={:.4}, fai={:.6}",
                red, nir, swir, baseline, nir - baseline
            );
            nir - baseline
        } else {
            0.0
        };

        IndexResult::new(IndexKind::Fai, fai)
    }

    /// Compute all five indices for one measurement
    pub fn calculate_all(&self, measurement: &SpectralMeasurement) -> IndexSet {
        IndexSet {
            ndvi: self.ndvi(measurement),
            ndwi: self.ndwi(measurement),
            chlorophyll_a: self.chlorophyll_a(measurement),
            turbidity: self.turbidity(measurement),
            fai: self.fai(measurement),
        }
    }

    /// Composite 0-100 water-quality index combining chlorophyll, turbidity and FAI penalties
    pub fn comprehensive_index(&self, measurement: &SpectralMeasurement) -> ComprehensiveIndex {
        let indices = self.calculate_all(measurement);
        let chl = indices.value(IndexKind::ChlorophyllA);
        let turbidity = indices.value(IndexKind::Turbidity);
        let fai = indices.value(IndexKind::Fai);

        let chl_score = (100.0 - chl * 2.0).max(0.0);
        let turbidity_score = (100.0 - turbidity).max(0.0);
        let fai_score = (100.0 - fai * 1000.0).max(0.0);
        let composite_score = chl_score * 0.4 + turbidity_score * 0.3 + fai_score * 0.3;

        ComprehensiveIndex {
            indices,
            composite_score,
            quality_category: QualityCategory::from_score(composite_score),
            recommendations: management_recommendations(composite_score, chl, turbidity),
        }
    }

    /// NDVI approximation using the green channel as a NIR proxy
    pub fn ndvi_from_rgb(&self, means: [f64; 3]) -> f64 {
        let [red, green, _] = means;
        normalized_difference(green, red)
    }

    /// Chlorophyll-a estimate from the green/red ratio, clamped to 0-100 μg/L
    pub fn chlorophyll_from_rgb(&self, means: [f64; 3]) -> f64 {
        let [red, green, _] = means;
        if red == 0.0 {
            return 0.0;
        }
        let chl = 15.0 * (green / red).powf(1.2);
        if chl.is_finite() {
            chl.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Turbidity estimate from overall brightness, clamped to 0-100 NTU
    pub fn turbidity_from_rgb(&self, means: [f64; 3]) -> f64 {
        let brightness = (means[0] + means[1] + means[2]) / 3.0;
        (50.0 * brightness / 255.0).clamp(0.0, 100.0)
    }

    /// All RGB approximations for a photograph
    pub fn from_rgb(&self, image: &RgbImage) -> RgbIndices {
        let means = channel_means(image);
        RgbIndices {
            ndvi: self.ndvi_from_rgb(means),
            chlorophyll_a: self.chlorophyll_from_rgb(means),
            turbidity: self.turbidity_from_rgb(means),
        }
    }
}

fn management_recommendations(score: f64, chl: f64, turbidity: f64) -> Vec<String> {
    let mut recommendations = Vec::new();

    if score < 40.0 {
        recommendations.push("Immediate intervention required".to_string());
        recommendations.push("Restrict water use for drinking/recreation".to_string());
    }
    if chl > 20.0 {
        recommendations.push("Implement nutrient reduction strategies".to_string());
        recommendations.push("Consider algaecide treatment if appropriate".to_string());
    }
    if turbidity > 25.0 {
        recommendations.push("Investigate sediment sources".to_string());
        recommendations.push("Improve erosion control in watershed".to_string());
    }
    if score > 70.0 {
        recommendations.push("Maintain current management practices".to_string());
        recommendations.push("Continue regular monitoring".to_string());
    }

    recommendations
}
