// src/image_utils.rs - HSV conversion, colour-range masks and pixel statistics

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Mask value for pixels inside a segmented region
pub const MASK_ON: u8 = 255;

/// Inclusive lower/upper HSV bounds on the 0-180 hue, 0-255 saturation/value scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }

    /// True when some channel's lower bound exceeds its upper bound
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.lower[i] > self.upper[i])
    }
}

/// Convert one RGB pixel to HSV with hue halved to fit a byte (0-180)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f64;
    let g = rgb[1] as f64;
    let b = rgb[2] as f64;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        ((hue / 2.0).round() as u16).min(180) as u8,
        saturation.round().min(255.0) as u8,
        max as u8,
    ]
}

/// Per-pixel HSV conversion of a whole image, stored in an RGB buffer
pub fn to_hsv_image(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut hsv = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        hsv.put_pixel(x, y, image::Rgb(rgb_to_hsv(pixel.0)));
    }
    hsv
}

/// Binary mask of pixels whose HSV value falls inside `range`
pub fn in_range_mask(hsv: &RgbImage, range: &HsvRange) -> GrayImage {
    let (width, height) = hsv.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in hsv.enumerate_pixels() {
        let value = if range.contains(pixel.0) { MASK_ON } else { 0 };
        mask.put_pixel(x, y, Luma([value]));
    }
    mask
}

/// Mean R, G and B intensities; zeros for an empty image
pub fn channel_means(image: &RgbImage) -> [f64; 3] {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return [0.0; 3];
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, &channel) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += channel as u64;
        }
    }
    sums.map(|s| s as f64 / count as f64)
}

/// Count of set pixels in a binary mask
pub fn count_mask_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] > 0).count() as u64
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// Square structuring element of odd side `size` (even sizes are bumped up by one)
pub fn square_kernel(size: u32) -> Vec<(i32, i32)> {
    let size = if size % 2 == 0 { size + 1 } else { size };
    let radius = (size / 2) as i32;
    let mut offsets = Vec::with_capacity((size * size) as usize);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            offsets.push((dx, dy));
        }
    }
    offsets
}
