// src/morphology.rs - Binary mask morphology and contour extraction

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::filter::median_filter;

use crate::image_utils::{in_bounds, square_kernel, MASK_ON};

/// Binary erosion: a pixel survives only if every in-bounds kernel neighbour is set.
/// Pixels beyond the image edge do not erode.
pub fn erode_mask(mask: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            if mask.get_pixel(x, y)[0] == 0 {
                continue;
            }

            let mut erode = false;
            for &(dx, dy) in kernel {
                let img_x = x as i32 + dx;
                let img_y = y as i32 + dy;
                if in_bounds(img_x, img_y, width, height)
                    && mask.get_pixel(img_x as u32, img_y as u32)[0] == 0
                {
                    erode = true;
                    break;
                }
            }

            if !erode {
                result.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }

    result
}

/// Binary dilation: a pixel is set if any in-bounds kernel neighbour is set
pub fn dilate_mask(mask: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let dilate = kernel.iter().any(|&(dx, dy)| {
                let img_x = x as i32 + dx;
                let img_y = y as i32 + dy;
                in_bounds(img_x, img_y, width, height)
                    && mask.get_pixel(img_x as u32, img_y as u32)[0] > 0
            });

            if dilate {
                result.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }

    result
}

/// Morphological opening (erosion followed by dilation); removes speckle
pub fn apply_opening(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let kernel = square_kernel(kernel_size);
    dilate_mask(&erode_mask(mask, &kernel), &kernel)
}

/// Morphological closing (dilation followed by erosion); fills pinholes
pub fn apply_closing(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let kernel = square_kernel(kernel_size);
    erode_mask(&dilate_mask(mask, &kernel), &kernel)
}

/// Closing, then opening, then a median filter to smooth ragged edges
pub fn clean_mask(mask: &GrayImage, kernel_size: u32, median_radius: u32) -> GrayImage {
    let closed = apply_closing(mask, kernel_size);
    let opened = apply_opening(&closed, kernel_size);
    if median_radius == 0 {
        opened
    } else {
        median_filter(&opened, median_radius, median_radius)
    }
}

/// Outer border of every connected region in the mask, as ordered pixel coordinates
pub fn outer_contours(mask: &GrayImage) -> Vec<Vec<(u32, u32)>> {
    find_contours::<u32>(mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .map(|contour| contour.points.into_iter().map(|p| (p.x, p.y)).collect())
        .collect()
}
