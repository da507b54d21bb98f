// src/shape_analysis.rs - Contour geometry used by the detection confidence score

use std::f64::consts::PI;

/// Closed-polygon length of an ordered contour
pub fn calculate_perimeter(contour_points: &[(u32, u32)]) -> f64 {
    if contour_points.len() < 2 {
        return 0.0;
    }

    let n = contour_points.len();
    let mut perimeter = 0.0;

    for i in 0..n {
        let (x1, y1) = contour_points[i];
        let (x2, y2) = contour_points[(i + 1) % n]; // Wrap around to first point

        let dx = x2 as f64 - x1 as f64;
        let dy = y2 as f64 - y1 as f64;
        perimeter += (dx * dx + dy * dy).sqrt();
    }

    perimeter
}

/// Polygon area enclosed by the contour (shoelace formula)
pub fn calculate_polygon_area(contour_points: &[(u32, u32)]) -> f64 {
    if contour_points.len() < 3 {
        return 0.0;
    }

    let n = contour_points.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = contour_points[i];
            let (x2, y2) = contour_points[(i + 1) % n];
            x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Isoperimetric ratio 4πA/P²; 1.0 for a perfect circle
pub fn calculate_circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * PI * area) / (perimeter * perimeter)
}

/// Compactness of a set of regions: 4π·ΣA/(ΣP)², capped at 1.0
pub fn region_compactness(contours: &[Vec<(u32, u32)>]) -> f64 {
    let total_area: f64 = contours.iter().map(|c| calculate_polygon_area(c)).sum();
    let total_perimeter: f64 = contours.iter().map(|c| calculate_perimeter(c)).sum();
    calculate_circularity(total_area, total_perimeter).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn square(side: u32) -> Vec<(u32, u32)> {
        vec![(0, 0), (side, 0), (side, side), (0, side)]
    }

    #[test]
    fn square_geometry() {
        let sq = square(10);
        assert_approx_eq!(calculate_perimeter(&sq), 40.0, 1e-12);
        assert_approx_eq!(calculate_polygon_area(&sq), 100.0, 1e-12);
        assert_approx_eq!(calculate_circularity(100.0, 40.0), PI / 4.0, 1e-12);
    }

    #[test]
    fn degenerate_contours() {
        assert_eq!(calculate_perimeter(&[(3, 3)]), 0.0);
        assert_eq!(calculate_polygon_area(&[(0, 0), (5, 0)]), 0.0);
        assert_eq!(calculate_circularity(10.0, 0.0), 0.0);
        assert_eq!(region_compactness(&[]), 0.0);
    }

    #[test]
    fn compactness_is_capped() {
        let contours = vec![square(10), square(4)];
        let c = region_compactness(&contours);
        assert!(c > 0.0 && c <= 1.0);
    }
}
