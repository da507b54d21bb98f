// src/detection.rs - Colour-segmentation algae detection on waterbody photographs

use std::collections::BTreeMap;
use std::fmt;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::image_utils::{channel_means, count_mask_pixels, in_range_mask, to_hsv_image, HsvRange};
use crate::morphology::{clean_mask, outer_contours};
use crate::shape_analysis::region_compactness;

/// Colour families the segmentation looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgaeType {
    GreenAlgae,
    BlueGreenAlgae,
    BrownAlgae,
    /// Single undifferentiated estimate produced by the mean-channel fallback
    EstimatedAlgae,
}

impl AlgaeType {
    /// Overlay colour for the family
    pub fn overlay_color(&self) -> [u8; 3] {
        match self {
            AlgaeType::GreenAlgae => [0, 255, 0],
            AlgaeType::BlueGreenAlgae => [255, 255, 0],
            AlgaeType::BrownAlgae => [255, 165, 0],
            AlgaeType::EstimatedAlgae => [0, 200, 0],
        }
    }
}

impl fmt::Display for AlgaeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlgaeType::GreenAlgae => "green algae",
            AlgaeType::BlueGreenAlgae => "blue-green algae",
            AlgaeType::BrownAlgae => "brown algae",
            AlgaeType::EstimatedAlgae => "estimated algae",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Segmentation,
    MeanChannelFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeCoverage {
    pub pixels: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    /// Sum of per-family coverage, capped at 100
    pub total_coverage: f64,
    pub by_type: BTreeMap<AlgaeType, TypeCoverage>,
    pub total_pixels: u64,
}

impl CoverageStats {
    pub fn percentage_of(&self, algae_type: AlgaeType) -> f64 {
        self.by_type.get(&algae_type).map(|c| c.percentage).unwrap_or(0.0)
    }
}

/// Water-quality proxies read off image colour statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterQualityMetrics {
    /// NTU-like, 0-100
    pub estimated_turbidity: f64,
    /// μg/L-like, 0-200
    pub estimated_chlorophyll: f64,
    pub water_clarity: f64,
    pub color_intensity: f64,
}

/// Cleaned binary mask for one algae family
#[derive(Debug, Clone)]
pub struct AlgaeMask {
    pub algae_type: AlgaeType,
    pub mask: GrayImage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub method: DetectionMethod,
    pub coverage: CoverageStats,
    /// 0-100
    pub detection_confidence: f64,
    /// `None` when the image has no pixels to measure
    pub quality_metrics: Option<WaterQualityMetrics>,
    pub recommendations: Vec<String>,
    #[serde(skip)]
    pub masks: Vec<AlgaeMask>,
}

/// How an image will be analysed; chosen once per image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    Segmentation,
    MeanChannel,
}

/// Fixed confidence reported by the mean-channel heuristic
pub const FALLBACK_CONFIDENCE: f64 = 60.0;

/// Smallest image the morphological pipeline can work on
const MIN_SEGMENTATION_SIDE: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct ImageAlgaeDetector {
    config: DetectionConfig,
}

impl ImageAlgaeDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn strategy_for(&self, image: &RgbImage) -> DetectionStrategy {
        let (width, height) = image.dimensions();
        if self.config.enable_segmentation
            && width >= MIN_SEGMENTATION_SIDE
            && height >= MIN_SEGMENTATION_SIDE
        {
            DetectionStrategy::Segmentation
        } else {
            DetectionStrategy::MeanChannel
        }
    }

    /// Detect algae in an RGB photograph
    pub fn detect(&self, image: &RgbImage) -> DetectionResult {
        match self.strategy_for(image) {
            DetectionStrategy::Segmentation => self.segment(image),
            DetectionStrategy::MeanChannel => {
                log::info!(
                    "Segmentation unavailable for {}x{} image; using mean-channel heuristic",
                    image.width(),
                    image.height()
                );
                self.fallback(image)
            }
        }
    }

    fn ranges(&self) -> [(AlgaeType, HsvRange); 3] {
        [
            (AlgaeType::GreenAlgae, self.config.green_range),
            (AlgaeType::BlueGreenAlgae, self.config.blue_green_range),
            (AlgaeType::BrownAlgae, self.config.brown_range),
        ]
    }

    /// Blur, convert to HSV, threshold each family and clean the masks
    pub fn segment_masks(&self, image: &RgbImage) -> Vec<AlgaeMask> {
        let blurred = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(image, self.config.blur_sigma)
        } else {
            image.clone()
        };
        let hsv = to_hsv_image(&blurred);

        self.ranges()
            .iter()
            .map(|(algae_type, range)| {
                let raw = in_range_mask(&hsv, range);
                AlgaeMask {
                    algae_type: *algae_type,
                    mask: clean_mask(&raw, self.config.kernel_size, self.config.median_radius),
                }
            })
            .collect()
    }

    fn segment(&self, image: &RgbImage) -> DetectionResult {
        let masks = self.segment_masks(image);
        let total_pixels = image.width() as u64 * image.height() as u64;

        let coverage = coverage_stats(&masks, total_pixels);
        let detection_confidence = mask_confidence(&masks, total_pixels);
        let quality_metrics = analyze_water_quality(image);
        let recommendations = image_recommendations(&coverage);

        log::debug!(
            "Segmentation: coverage {:.2}%, confidence {:.1}",
            coverage.total_coverage,
            detection_confidence
        );

        DetectionResult {
            method: DetectionMethod::Segmentation,
            coverage,
            detection_confidence,
            quality_metrics,
            recommendations,
            masks,
        }
    }

    /// Green-dominance heuristic; coverage bounded to 0-50% with fixed confidence
    pub fn fallback(&self, image: &RgbImage) -> DetectionResult {
        let total_pixels = image.width() as u64 * image.height() as u64;
        let [red, green, blue] = channel_means(image);

        let dominance = green / ((red + blue) / 2.0).max(1.0);
        let coverage = ((dominance - 1.0) * 25.0).clamp(0.0, 50.0);

        let quality_metrics = if total_pixels > 0 {
            let brightness = (red + green + blue) / 3.0;
            Some(WaterQualityMetrics {
                estimated_turbidity: (50.0 * brightness / 255.0).clamp(5.0, 25.0),
                estimated_chlorophyll: coverage * 0.8,
                water_clarity: (100.0 - coverage * 2.0).max(0.0),
                color_intensity: green,
            })
        } else {
            None
        };

        let mut by_type = BTreeMap::new();
        by_type.insert(
            AlgaeType::EstimatedAlgae,
            TypeCoverage {
                pixels: (coverage / 100.0 * total_pixels as f64).round() as u64,
                percentage: coverage,
            },
        );

        DetectionResult {
            method: DetectionMethod::MeanChannelFallback,
            coverage: CoverageStats {
                total_coverage: coverage,
                by_type,
                total_pixels,
            },
            detection_confidence: FALLBACK_CONFIDENCE,
            quality_metrics,
            recommendations: vec![
                "Basic analysis performed - consider professional testing".to_string(),
                "Upload higher resolution images for better analysis".to_string(),
            ],
            masks: Vec::new(),
        }
    }

    /// Blend each family's colour into the image where its mask is set
    pub fn overlay(&self, image: &RgbImage, masks: &[AlgaeMask]) -> RgbImage {
        let alpha = self.config.overlay_alpha;
        let mut overlay = image.clone();

        for algae_mask in masks {
            let color = algae_mask.algae_type.overlay_color();
            for (x, y, pixel) in algae_mask.mask.enumerate_pixels() {
                if pixel[0] == 0 || x >= overlay.width() || y >= overlay.height() {
                    continue;
                }
                let base = overlay.get_pixel(x, y).0;
                let mut blended = [0u8; 3];
                for c in 0..3 {
                    let value = base[c] as f32 * alpha + color[c] as f32 * (1.0 - alpha);
                    blended[c] = value.round().clamp(0.0, 255.0) as u8;
                }
                overlay.put_pixel(x, y, Rgb(blended));
            }
        }

        overlay
    }
}

fn coverage_stats(masks: &[AlgaeMask], total_pixels: u64) -> CoverageStats {
    let mut by_type = BTreeMap::new();
    let mut total_algae_pixels = 0u64;

    for m in masks {
        let pixels = count_mask_pixels(&m.mask);
        let percentage = if total_pixels > 0 {
            pixels as f64 / total_pixels as f64 * 100.0
        } else {
            0.0
        };
        by_type.insert(m.algae_type, TypeCoverage { pixels, percentage });
        total_algae_pixels += pixels;
    }

    let total_coverage = if total_pixels > 0 {
        (total_algae_pixels as f64 / total_pixels as f64 * 100.0).min(100.0)
    } else {
        0.0
    };

    CoverageStats {
        total_coverage,
        by_type,
        total_pixels,
    }
}

/// Mean over non-empty masks of coverage-relative-to-10% (60%) and compactness (40%)
fn mask_confidence(masks: &[AlgaeMask], total_pixels: u64) -> f64 {
    if total_pixels == 0 {
        return 0.0;
    }

    let scores: Vec<f64> = masks
        .iter()
        .filter_map(|m| {
            let pixels = count_mask_pixels(&m.mask);
            if pixels == 0 {
                return None;
            }
            let coverage_factor = (pixels as f64 / (total_pixels as f64 * 0.1)).min(1.0);
            let continuity = region_compactness(&outer_contours(&m.mask));
            Some((coverage_factor * 0.6 + continuity * 0.4) * 100.0)
        })
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Turbidity, chlorophyll and clarity proxies from mean HSV and green intensity
fn analyze_water_quality(image: &RgbImage) -> Option<WaterQualityMetrics> {
    let total_pixels = image.width() as u64 * image.height() as u64;
    if total_pixels == 0 {
        return None;
    }

    let hsv = to_hsv_image(image);
    let [_, mean_saturation, mean_value] = channel_means(&hsv);
    let [_, mean_green, _] = channel_means(image);

    let turbidity = (255.0 - mean_value) * (mean_saturation / 255.0) * 0.4;
    let chlorophyll = mean_green / 255.0 * 30.0;

    Some(WaterQualityMetrics {
        estimated_turbidity: turbidity.min(100.0),
        estimated_chlorophyll: chlorophyll.min(200.0),
        water_clarity: (100.0 - turbidity).max(0.0),
        color_intensity: mean_saturation,
    })
}

fn image_recommendations(coverage: &CoverageStats) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    let total = coverage.total_coverage;

    if total > 30.0 {
        recommendations.push("High algae coverage detected - immediate action required".into());
        recommendations.push("Consider professional water testing".into());
        recommendations.push("Restrict recreational activities".into());
    } else if total > 15.0 {
        recommendations.push("Moderate algae presence - monitor closely".into());
        recommendations.push("Consider nutrient source reduction".into());
    } else if total > 5.0 {
        recommendations.push("Low algae levels detected - maintain monitoring".into());
    } else {
        recommendations.push("Minimal algae detected - water appears healthy".into());
    }

    if coverage.percentage_of(AlgaeType::BlueGreenAlgae) > 5.0 {
        recommendations.push("Blue-green algae detected - potential toxicity risk".into());
        recommendations.push("Avoid contact with water until tested".into());
    }
    if coverage.percentage_of(AlgaeType::BrownAlgae) > 10.0 {
        recommendations.push("Brown algae may indicate organic pollution".into());
        recommendations.push("Check for sewage or agricultural runoff".into());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    #[test]
    fn fully_green_image_is_full_coverage() {
        let detector = ImageAlgaeDetector::default();
        let result = detector.detect(&uniform(32, 32, [20, 180, 30]));
        assert_eq!(result.method, DetectionMethod::Segmentation);
        assert_approx_eq!(result.coverage.total_coverage, 100.0, 1e-9);
        assert_approx_eq!(result.coverage.percentage_of(AlgaeType::GreenAlgae), 100.0, 1e-9);
        assert!(result.detection_confidence >= 60.0 && result.detection_confidence <= 100.0);
        assert!(result.recommendations[0].starts_with("High algae coverage"));
    }

    #[test]
    fn grey_water_has_no_algae() {
        let detector = ImageAlgaeDetector::default();
        let result = detector.detect(&uniform(24, 24, [120, 120, 125]));
        assert_eq!(result.coverage.total_coverage, 0.0);
        assert_eq!(result.detection_confidence, 0.0);
        assert_eq!(result.recommendations, vec!["Minimal algae detected - water appears healthy"]);
    }

    #[test]
    fn half_green_image() {
        let mut image = uniform(40, 40, [110, 110, 115]);
        for y in 0..40 {
            for x in 0..20 {
                image.put_pixel(x, y, Rgb([20, 180, 30]));
            }
        }
        let result = ImageAlgaeDetector::default().detect(&image);
        let coverage = result.coverage.total_coverage;
        assert!(coverage > 40.0 && coverage < 60.0, "coverage {} not near half", coverage);
    }

    #[test]
    fn tiny_image_uses_fallback() {
        let detector = ImageAlgaeDetector::default();
        let result = detector.detect(&uniform(2, 2, [50, 150, 50]));
        assert_eq!(result.method, DetectionMethod::MeanChannelFallback);
        assert_eq!(result.detection_confidence, FALLBACK_CONFIDENCE);
        // dominance 3.0 -> (3 - 1) * 25 = 50
        assert_approx_eq!(result.coverage.total_coverage, 50.0, 1e-12);
        let q = result.quality_metrics.unwrap();
        assert_approx_eq!(q.estimated_chlorophyll, 40.0, 1e-12);
        assert_approx_eq!(q.water_clarity, 0.0, 1e-12);
    }

    #[test]
    fn fallback_is_bounded_and_deterministic() {
        let config = DetectionConfig {
            enable_segmentation: false,
            ..DetectionConfig::default()
        };
        let detector = ImageAlgaeDetector::new(config);
        let image = uniform(10, 10, [0, 255, 0]);
        let a = detector.detect(&image);
        let b = detector.detect(&image);
        assert_eq!(a.coverage.total_coverage, 50.0);
        assert_eq!(a.quality_metrics, b.quality_metrics);

        let red = detector.detect(&uniform(10, 10, [200, 10, 10]));
        assert_eq!(red.coverage.total_coverage, 0.0);
    }

    #[test]
    fn empty_image_has_no_quality_metrics() {
        let result = ImageAlgaeDetector::default().detect(&RgbImage::new(0, 0));
        assert!(result.quality_metrics.is_none());
        assert_eq!(result.coverage.total_coverage, 0.0);
    }

    #[test]
    fn quality_metrics_from_colour_statistics() {
        // Pure green: S = 255, V = 255 -> turbidity 0, chlorophyll 30
        let q = analyze_water_quality(&uniform(4, 4, [0, 255, 0])).unwrap();
        assert_approx_eq!(q.estimated_turbidity, 0.0, 1e-12);
        assert_approx_eq!(q.estimated_chlorophyll, 30.0, 1e-12);
        assert_approx_eq!(q.water_clarity, 100.0, 1e-12);
    }

    #[test]
    fn overlay_only_touches_masked_pixels() {
        let detector = ImageAlgaeDetector::default();
        let image = uniform(4, 4, [100, 100, 100]);
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, image::Luma([255]));
        let overlay = detector.overlay(
            &image,
            &[AlgaeMask {
                algae_type: AlgaeType::GreenAlgae,
                mask,
            }],
        );
        assert_eq!(overlay.get_pixel(0, 0).0, [100, 100, 100]);
        let blended = overlay.get_pixel(1, 1).0;
        assert_eq!(blended[0], 70);
        assert!((146..=147).contains(&blended[1]), "green channel {}", blended[1]);
    }
}
