use std::f64::consts::PI;

use image::{GrayImage, Luma};
use imageproc::geometry::{arc_length, contour_area, convex_hull};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::Serialize;

use super::color::is_badge_red;
use super::pixels::{PerimeterModel, PixelView};

const FOREGROUND: u8 = 255;

/// Shape descriptors of the badge-red mask of one crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ShapeFeatures {
    pub circularity: f64,
    pub compactness: f64,
    pub cluster_count: u32,
}

/// Binary foreground mask; badge-red pixels are 255, everything else 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedMask {
    mask: GrayImage,
}

impl RedMask {
    pub fn from_view(view: &PixelView<'_>) -> Self {
        let bits: Vec<bool> = view.pixels().map(is_badge_red).collect();
        Self::from_bits(view.width(), view.height(), bits)
    }

    /// Builds a mask from row-major foreground flags.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        let mask = GrayImage::from_fn(width, height, |x, y| {
            let set = bits[(y * width + x) as usize];
            Luma([if set { FOREGROUND } else { 0 }])
        });
        Self { mask }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y)[0] == FOREGROUND
    }

    pub fn count(&self) -> usize {
        self.mask.pixels().filter(|p| p[0] == FOREGROUND).count()
    }

    fn points(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == FOREGROUND)
            .map(|(x, y, _)| (x, y))
    }

    /// Inclusive `(min_x, min_y, max_x, max_y)` of the foreground.
    fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        self.points().fold(None, |bbox, (x, y)| {
            Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            })
        })
    }

    /// Number of 8-connected foreground components.
    pub fn cluster_count(&self) -> u32 {
        // Labels run 1..=n over the foreground, so the highest one is n.
        let labeled = connected_components(&self.mask, Connectivity::Eight, Luma([0]));
        labeled.pixels().map(|p| p[0]).max().unwrap_or(0)
    }
}

/// Extracts circularity, compactness and cluster count from the red mask.
#[derive(Debug, Clone, Copy)]
pub struct ShapeAnalyzer {
    perimeter_model: PerimeterModel,
}

impl ShapeAnalyzer {
    pub fn new(perimeter_model: PerimeterModel) -> Self {
        Self { perimeter_model }
    }

    pub fn extract(&self, view: &PixelView<'_>) -> ShapeFeatures {
        self.extract_mask(&RedMask::from_view(view))
    }

    pub fn extract_mask(&self, mask: &RedMask) -> ShapeFeatures {
        let Some((min_x, min_y, max_x, max_y)) = mask.bounding_box() else {
            return ShapeFeatures::default();
        };

        let count = mask.count() as f64;
        let bbox_w = (max_x - min_x + 1) as f64;
        let bbox_h = (max_y - min_y + 1) as f64;

        let circularity = match self.perimeter_model {
            PerimeterModel::ConvexHull => {
                hull_circularity(mask).unwrap_or_else(|| bbox_circularity(count, bbox_w, bbox_h))
            }
            PerimeterModel::BoundingBox => bbox_circularity(count, bbox_w, bbox_h),
        };

        ShapeFeatures {
            circularity,
            compactness: count / (bbox_w * bbox_h),
            cluster_count: mask.cluster_count(),
        }
    }
}

fn circularity(area: f64, perimeter: f64) -> f64 {
    4.0 * PI * area / (perimeter * perimeter).max(1.0)
}

fn bbox_circularity(count: f64, bbox_w: f64, bbox_h: f64) -> f64 {
    circularity(count, 2.0 * (bbox_w + bbox_h))
}

/// `None` when the hull is degenerate (fewer than three vertices or no area).
fn hull_circularity(mask: &RedMask) -> Option<f64> {
    let points: Vec<Point<i32>> = mask
        .points()
        .map(|(x, y)| Point::new(x as i32, y as i32))
        .collect();
    if points.len() < 3 || collinear(&points) {
        return None;
    }

    let hull = convex_hull(points.as_slice());
    if hull.len() < 3 {
        return None;
    }

    let area = contour_area(&hull).abs();
    if area <= f64::EPSILON {
        return None;
    }
    Some(circularity(area, arc_length(&hull, true)))
}

fn collinear(points: &[Point<i32>]) -> bool {
    let a = points[0];
    let Some(b) = points.iter().copied().find(|p| *p != a) else {
        return true;
    };
    points.iter().all(|p| {
        let lhs = (b.x - a.x) as i64 * (p.y - a.y) as i64;
        let rhs = (b.y - a.y) as i64 * (p.x - a.x) as i64;
        lhs == rhs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::pixels::PixelBackend;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const RED: Rgb<u8> = Rgb([240, 30, 40]);
    const BACKGROUND: Rgb<u8> = Rgb([250, 250, 250]);

    fn disk(size: u32, radius: f64) -> RgbImage {
        let c = size as f64 / 2.0;
        RgbImage::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as f64 + 0.5 - c, y as f64 + 0.5 - c);
            if dx * dx + dy * dy <= radius * radius {
                RED
            } else {
                BACKGROUND
            }
        })
    }

    fn features(image: &RgbImage, model: PerimeterModel) -> ShapeFeatures {
        ShapeAnalyzer::new(model).extract(&PixelView::new(image, PixelBackend::Bulk))
    }

    #[test]
    fn empty_mask_is_all_zero() {
        let image = RgbImage::from_pixel(12, 12, BACKGROUND);
        for model in [PerimeterModel::ConvexHull, PerimeterModel::BoundingBox] {
            let f = features(&image, model);
            assert_eq!(f, ShapeFeatures::default());
            assert_eq!(f.cluster_count, 0);
        }
    }

    #[test]
    fn diagonal_pair_is_one_cluster() {
        let mut image = RgbImage::from_pixel(6, 6, BACKGROUND);
        image.put_pixel(2, 2, RED);
        image.put_pixel(3, 3, RED);
        let f = features(&image, PerimeterModel::BoundingBox);
        assert_eq!(f.cluster_count, 1);
        assert_eq!(f.compactness, 0.5);
    }

    #[test]
    fn diagonal_pair_and_isolated_pixels_label_as_three() {
        let mut bits = vec![false; 6 * 6];
        for (x, y) in [(1, 1), (2, 2), (5, 0), (0, 5)] {
            bits[y * 6 + x] = true;
        }
        let mask = RedMask::from_bits(6, 6, bits);
        assert!(mask.get(2, 2));
        assert!(!mask.get(3, 3));
        assert_eq!(mask.count(), 4);
        assert_eq!(mask.cluster_count(), 3);
    }

    #[test]
    fn hull_metrics_of_a_square() {
        // 5x5 block of pixel centers: hull is a 4x4 square
        let bits = (0..49)
            .map(|i| (1..6).contains(&(i % 7)) && (1..6).contains(&(i / 7)))
            .collect();
        let mask = RedMask::from_bits(7, 7, bits);
        let hull = hull_circularity(&mask).unwrap();
        assert!((hull - 4.0 * PI * 16.0 / 256.0).abs() < 1e-9);
    }

    #[test]
    fn separated_blobs_count_separately() {
        let mut bits = vec![false; 5 * 3];
        bits[0] = true;
        bits[4] = true;
        bits[12] = true;
        let mask = RedMask::from_bits(5, 3, bits);
        assert_eq!(mask.cluster_count(), 3);
    }

    #[test]
    fn solid_square_is_fully_compact() {
        let mut image = RgbImage::from_pixel(10, 10, BACKGROUND);
        for y in 2..6 {
            for x in 3..7 {
                image.put_pixel(x, y, RED);
            }
        }
        let f = features(&image, PerimeterModel::BoundingBox);
        assert_eq!(f.compactness, 1.0);
        assert_eq!(f.cluster_count, 1);
        // 4 * pi * 16 / 16^2
        assert!((f.circularity - PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_fallback_underestimates_disk_circularity() {
        // The bbox perimeter 2*(w+h) = 8r overshoots the true 2*pi*r, so a
        // perfect disk scores about pi^2/16 ~ 0.62 under the fallback.
        let image = disk(40, 10.0);
        let bbox = features(&image, PerimeterModel::BoundingBox);
        assert!(bbox.circularity > 0.5 && bbox.circularity < 0.65);
        assert!((bbox.compactness - PI / 4.0).abs() < 0.05);
        assert_eq!(bbox.cluster_count, 1);

        let hull = features(&image, PerimeterModel::ConvexHull);
        assert!(hull.circularity > 0.85 && hull.circularity <= 1.0 + 1e-9);
        assert!(hull.circularity > bbox.circularity);
        assert_eq!(hull.compactness, bbox.compactness);
    }

    #[test]
    fn degenerate_hull_falls_back_to_bounding_box() {
        let mut image = RgbImage::from_pixel(8, 8, BACKGROUND);
        for x in 1..6 {
            image.put_pixel(x, 4, RED);
        }
        let hull = features(&image, PerimeterModel::ConvexHull);
        let bbox = features(&image, PerimeterModel::BoundingBox);
        assert_eq!(hull, bbox);
    }

    #[test]
    fn scattered_noise_is_fragmented_and_sparse() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut image = RgbImage::from_pixel(60, 30, BACKGROUND);
        for _ in 0..25 {
            let x = rng.random_range(0..30) * 2;
            let y = rng.random_range(0..15) * 2;
            image.put_pixel(x, y, RED);
        }
        // every foreground pixel sits on an even grid, so no two touch
        let f = features(&image, PerimeterModel::BoundingBox);
        let mask = RedMask::from_view(&PixelView::new(&image, PixelBackend::Scalar));
        assert_eq!(f.cluster_count as usize, mask.count());
        assert!(f.cluster_count > 3);
        assert!(f.compactness < 0.16);
    }
}
