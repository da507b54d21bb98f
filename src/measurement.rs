// src/measurement.rs - Spectral measurement contract and per-platform band tables

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Imaging platforms the index calculator knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Sentinel-2")]
    Sentinel2,
    #[serde(rename = "Landsat 8/9")]
    Landsat89,
    #[serde(rename = "MODIS")]
    Modis,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Sentinel2 => "Sentinel-2",
            Platform::Landsat89 => "Landsat 8/9",
            Platform::Modis => "MODIS",
        };
        f.write_str(name)
    }
}

/// Empirical relationship `scale * x^exponent`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    pub scale: f64,
    pub exponent: f64,
}

impl PowerLaw {
    pub const fn new(scale: f64, exponent: f64) -> Self {
        Self { scale, exponent }
    }

    /// Evaluate the law; non-finite results (negative base, zero base with
    /// a negative exponent) collapse to 0.0
    pub fn apply(&self, x: f64) -> f64 {
        let value = self.scale * x.powf(self.exponent);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

/// Band ratio used by a platform's chlorophyll-a algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChlorophyllRatio {
    /// red / red-edge (falls back to NIR when no red-edge band is delivered)
    RedOverRedEdge,
    /// blue / green
    BlueOverGreen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChlorophyllModel {
    pub ratio: ChlorophyllRatio,
    pub law: PowerLaw,
    /// Both ratio operands must be non-zero (OC3-style algorithms with negative exponents)
    pub requires_nonzero_numerator: bool,
}

/// Nominal band-centre wavelengths in nm, used by the FAI baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wavelengths {
    pub red: f64,
    pub nir: f64,
    pub swir: f64,
}

/// Band assignment and published coefficients for one platform
#[derive(Debug, Clone, Copy)]
pub struct PlatformSpec {
    pub blue: &'static str,
    pub green: &'static str,
    pub red: &'static str,
    pub red_edge: Option<&'static str>,
    pub nir: &'static str,
    pub swir: Option<&'static str>,
    pub chlorophyll: ChlorophyllModel,
    pub turbidity: PowerLaw,
    /// Whether red values above 1.0 are treated as scaled integers and divided by `reflectance_scale`
    pub rescale_turbidity_red: bool,
    /// FAI wavelengths; `None` when the platform lacks a SWIR band
    pub fai_wavelengths: Option<Wavelengths>,
    /// Integer scale of surface reflectance products
    pub reflectance_scale: f64,
    /// Nominal pixel size in metres
    pub pixel_scale_m: f64,
}

// Chlorophyll-a coefficient pairs (scale, exponent)
pub const SENTINEL2_CHLOROPHYLL: PowerLaw = PowerLaw::new(23.1, 2.4);
pub const LANDSAT_CHLOROPHYLL: PowerLaw = PowerLaw::new(18.5, 1.8);
pub const MODIS_OC3_CHLOROPHYLL: PowerLaw = PowerLaw::new(0.2424, -1.981);

// Turbidity coefficient pairs on red reflectance
pub const SENTINEL2_TURBIDITY: PowerLaw = PowerLaw::new(31.6, 0.64);
pub const LANDSAT_TURBIDITY: PowerLaw = PowerLaw::new(28.4, 0.72);
pub const MODIS_TURBIDITY: PowerLaw = PowerLaw::new(25.2, 0.68);

pub const SENTINEL2_WAVELENGTHS: Wavelengths = Wavelengths { red: 665.0, nir: 842.0, swir: 1610.0 };
pub const LANDSAT_WAVELENGTHS: Wavelengths = Wavelengths { red: 655.0, nir: 865.0, swir: 1610.0 };

const SENTINEL2_SPEC: PlatformSpec = PlatformSpec {
    blue: "B2",
    green: "B3",
    red: "B4",
    red_edge: Some("B5"),
    nir: "B8",
    swir: Some("B11"),
    chlorophyll: ChlorophyllModel {
        ratio: ChlorophyllRatio::RedOverRedEdge,
        law: SENTINEL2_CHLOROPHYLL,
        requires_nonzero_numerator: false,
    },
    turbidity: SENTINEL2_TURBIDITY,
    rescale_turbidity_red: true,
    fai_wavelengths: Some(SENTINEL2_WAVELENGTHS),
    reflectance_scale: 10000.0,
    pixel_scale_m: 10.0,
};

const LANDSAT_SPEC: PlatformSpec = PlatformSpec {
    blue: "SR_B2",
    green: "SR_B3",
    red: "SR_B4",
    red_edge: None,
    nir: "SR_B5",
    swir: Some("SR_B6"),
    chlorophyll: ChlorophyllModel {
        ratio: ChlorophyllRatio::BlueOverGreen,
        law: LANDSAT_CHLOROPHYLL,
        requires_nonzero_numerator: false,
    },
    turbidity: LANDSAT_TURBIDITY,
    rescale_turbidity_red: true,
    fai_wavelengths: Some(LANDSAT_WAVELENGTHS),
    reflectance_scale: 10000.0,
    pixel_scale_m: 30.0,
};

const MODIS_SPEC: PlatformSpec = PlatformSpec {
    blue: "sur_refl_b03",
    green: "sur_refl_b04",
    red: "sur_refl_b01",
    red_edge: None,
    nir: "sur_refl_b02",
    swir: None,
    chlorophyll: ChlorophyllModel {
        ratio: ChlorophyllRatio::BlueOverGreen,
        law: MODIS_OC3_CHLOROPHYLL,
        requires_nonzero_numerator: true,
    },
    turbidity: MODIS_TURBIDITY,
    rescale_turbidity_red: false,
    fai_wavelengths: None,
    reflectance_scale: 1.0,
    pixel_scale_m: 250.0,
};

impl Platform {
    /// Band table and coefficients for this platform
    pub fn spec(&self) -> &'static PlatformSpec {
        match self {
            Platform::Sentinel2 => &SENTINEL2_SPEC,
            Platform::Landsat89 => &LANDSAT_SPEC,
            Platform::Modis => &MODIS_SPEC,
        }
    }
}

fn default_cloud_cover() -> f64 {
    20.0
}

/// Acquisition metadata delivered alongside the band values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementMetadata {
    pub platform: Platform,
    #[serde(default)]
    pub acquired_at: Option<DateTime<Utc>>,
    #[serde(default = "default_cloud_cover")]
    pub cloud_cover_percent: f64,
    #[serde(default)]
    pub pixel_scale_m: Option<f64>,
}

impl MeasurementMetadata {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            acquired_at: None,
            cloud_cover_percent: default_cloud_cover(),
            pixel_scale_m: None,
        }
    }

    pub fn with_cloud_cover(mut self, cloud_cover_percent: f64) -> Self {
        self.cloud_cover_percent = cloud_cover_percent;
        self
    }

    pub fn with_acquired_at(mut self, acquired_at: DateTime<Utc>) -> Self {
        self.acquired_at = Some(acquired_at);
        self
    }

    /// Pixel scale reported by the provider, or the platform's nominal one
    pub fn effective_pixel_scale(&self) -> f64 {
        self.pixel_scale_m.unwrap_or(self.platform.spec().pixel_scale_m)
    }
}

/// Band-name to reflectance mapping produced by the imagery provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralMeasurement {
    #[serde(default)]
    bands: HashMap<String, f64>,
    metadata: MeasurementMetadata,
}

impl SpectralMeasurement {
    pub fn new(bands: HashMap<String, f64>, metadata: MeasurementMetadata) -> Self {
        Self { bands, metadata }
    }

    /// Convenience constructor from `(band, value)` pairs
    pub fn from_pairs<I, S>(pairs: I, metadata: MeasurementMetadata) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let bands = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { bands, metadata }
    }

    pub fn band(&self, name: &str) -> Option<f64> {
        self.bands.get(name).copied().filter(|v| v.is_finite())
    }

    pub fn bands(&self) -> &HashMap<String, f64> {
        &self.bands
    }

    pub fn metadata(&self) -> &MeasurementMetadata {
        &self.metadata
    }

    pub fn platform(&self) -> Platform {
        self.metadata.platform
    }

    /// True when the provider returned no band values at all
    pub fn is_empty(&self) -> bool {
        self.bands.values().all(|v| !v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_names_round_trip_through_json() {
        let json = serde_json::to_string(&Platform::Landsat89).unwrap();
        assert_eq!(json, "\"Landsat 8/9\"");
        let parsed: Platform = serde_json::from_str("\"Sentinel-2\"").unwrap();
        assert_eq!(parsed, Platform::Sentinel2);
    }

    #[test]
    fn modis_has_no_swir_band() {
        assert!(Platform::Modis.spec().swir.is_none());
        assert!(Platform::Modis.spec().fai_wavelengths.is_none());
        assert!(Platform::Sentinel2.spec().swir.is_some());
    }

    #[test]
    fn power_law_rejects_non_finite_results() {
        assert_eq!(MODIS_OC3_CHLOROPHYLL.apply(0.0), 0.0);
        assert_eq!(SENTINEL2_TURBIDITY.apply(-0.2), 0.0);
    }

    #[test]
    fn measurement_deserializes_with_defaults() {
        let json = r#"{
            "bands": {"B4": 0.05, "B8": 0.35},
            "metadata": {"platform": "Sentinel-2"}
        }"#;
        let m: SpectralMeasurement = serde_json::from_str(json).unwrap();
        assert_eq!(m.platform(), Platform::Sentinel2);
        assert_eq!(m.metadata().cloud_cover_percent, 20.0);
        assert_eq!(m.metadata().effective_pixel_scale(), 10.0);
        assert_eq!(m.band("B4"), Some(0.05));
        assert!(m.band("B11").is_none());
        assert!(!m.is_empty());
    }
}
