use chrono::{DateTime, Utc};
use image::{imageops, DynamicImage, RgbImage};
use serde::Serialize;
use tracing::trace;

use super::color::{ColorClassifier, ColorStats};
use super::pixels::{Capabilities, PixelView};
use super::region::BadgeRegion;
use super::shape::{ShapeAnalyzer, ShapeFeatures};
use crate::config::MonitorConfig;
use crate::error::MonitorError;

/// Raw measurements of one region in one capture attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeSample {
    pub region: BadgeRegion,
    pub size: (u32, u32),
    pub red_pixels: u32,
    pub vivid_pixels: u32,
    pub hsv_pixels: u32,
    pub red_ratio: f64,
    pub vivid_ratio: f64,
    pub hsv_ratio: f64,
    pub saturation_mean: f32,
    pub value_mean: f32,
    pub circularity: f64,
    pub compactness: f64,
    pub cluster_count: u32,
    pub captured_at: DateTime<Utc>,
}

impl BadgeSample {
    pub fn from_measurements(
        region: BadgeRegion,
        size: (u32, u32),
        color: ColorStats,
        shape: ShapeFeatures,
    ) -> Self {
        let area = (size.0 as f64 * size.1 as f64).max(1.0);
        Self {
            region,
            size,
            red_pixels: color.red_count,
            vivid_pixels: color.vivid_count,
            hsv_pixels: color.hsv_count,
            red_ratio: color.red_count as f64 / area,
            vivid_ratio: color.vivid_count as f64 / area,
            hsv_ratio: color.hsv_count as f64 / area,
            saturation_mean: color.mean_saturation,
            value_mean: color.mean_value,
            circularity: shape.circularity,
            compactness: shape.compactness,
            cluster_count: shape.cluster_count,
            captured_at: Utc::now(),
        }
    }
}

/// Crops a region out of a screenshot and measures it.
#[derive(Debug, Clone)]
pub struct SampleCollector {
    capabilities: Capabilities,
    classifier: ColorClassifier,
    shape: ShapeAnalyzer,
    run_shape_analysis: bool,
}

impl SampleCollector {
    pub fn new(config: &MonitorConfig, capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            classifier: ColorClassifier::new(),
            shape: ShapeAnalyzer::new(capabilities.perimeter_model),
            run_shape_analysis: config.needs_shape_analysis(),
        }
    }

    pub fn collect(
        &self,
        image: &DynamicImage,
        region: &BadgeRegion,
    ) -> Result<BadgeSample, MonitorError> {
        let bounds = region.pixel_bounds(image.width(), image.height())?;

        let crop: RgbImage = match image {
            DynamicImage::ImageRgb8(rgb) => {
                imageops::crop_imm(rgb, bounds.left, bounds.top, bounds.width(), bounds.height())
                    .to_image()
            }
            other => other
                .crop_imm(bounds.left, bounds.top, bounds.width(), bounds.height())
                .to_rgb8(),
        };
        let view = PixelView::new(&crop, self.capabilities.pixel_backend);

        let color = self.classifier.classify(&view);
        let shape = if self.run_shape_analysis {
            self.shape.extract(&view)
        } else {
            ShapeFeatures::default()
        };

        trace!(
            channel = %region.channel,
            left = bounds.left,
            top = bounds.top,
            width = bounds.width(),
            height = bounds.height(),
            red = color.red_count,
            clusters = shape.cluster_count,
            "Collected region sample"
        );

        Ok(BadgeSample::from_measurements(
            *region,
            (bounds.width(), bounds.height()),
            color,
            shape,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::region::Channel;
    use image::Rgb;

    fn collector(config: &MonitorConfig) -> SampleCollector {
        SampleCollector::new(config, Capabilities::detect(config))
    }

    fn screen_with_block() -> DynamicImage {
        let mut image = RgbImage::from_pixel(100, 50, Rgb([20, 20, 24]));
        for y in 10..20 {
            for x in 60..70 {
                image.put_pixel(x, y, Rgb([255, 40, 60]));
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    #[test]
    fn collect_measures_crop_and_ratios() {
        let config = MonitorConfig::default();
        let region = BadgeRegion::new(Channel::Notifications, 0.5, 0.75, 0.0, 0.5);
        let sample = collector(&config).collect(&screen_with_block(), &region).unwrap();

        assert_eq!(sample.size, (25, 25));
        assert_eq!(sample.red_pixels, 100);
        assert_eq!(sample.vivid_pixels, 100);
        assert_eq!(sample.hsv_pixels, 100);
        assert!((sample.red_ratio - 100.0 / 625.0).abs() < 1e-12);
        assert_eq!(sample.cluster_count, 1);
        assert_eq!(sample.compactness, 1.0);
    }

    #[test]
    fn collect_converts_non_rgb_images() {
        let config = MonitorConfig::default();
        let region = BadgeRegion::new(Channel::Notifications, 0.5, 0.75, 0.0, 0.5);
        let rgba = DynamicImage::ImageRgba8(screen_with_block().to_rgba8());
        let sample = collector(&config).collect(&rgba, &region).unwrap();
        assert_eq!(sample.red_pixels, 100);
    }

    #[test]
    fn inverted_region_fails_fast() {
        let config = MonitorConfig::default();
        let region = BadgeRegion::new(Channel::Notifications, 1.2, 0.5, 0.0, 0.5).clamp();
        assert!(region.x_start > region.x_end);

        let result = collector(&config).collect(&screen_with_block(), &region);
        assert!(matches!(
            result,
            Err(MonitorError::InvalidRegion {
                channel: Channel::Notifications,
                ..
            })
        ));
    }

    #[test]
    fn shape_analysis_skipped_when_shape_votes_disabled() {
        let config = MonitorConfig {
            enable_circularity: false,
            enable_compactness: false,
            ..MonitorConfig::default()
        };
        let region = BadgeRegion::new(Channel::Messages, 0.5, 0.75, 0.0, 0.5);
        let sample = collector(&config).collect(&screen_with_block(), &region).unwrap();

        assert_eq!(sample.red_pixels, 100);
        assert_eq!(sample.circularity, 0.0);
        assert_eq!(sample.compactness, 0.0);
        assert_eq!(sample.cluster_count, 0);
    }
}
