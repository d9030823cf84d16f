//! Pixel access over a cropped badge region, and the backend capability set
//! chosen once when a monitor is built.
use image::RgbImage;
use serde::Serialize;
use tracing::debug;

use crate::config::MonitorConfig;

/// How pixels are walked. Both strategies yield identical RGB triples in
/// row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelBackend {
    /// Walks the contiguous raw buffer in 3-byte chunks.
    Bulk,
    /// Addresses each pixel by coordinate.
    Scalar,
}

/// How the red mask perimeter is measured for circularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerimeterModel {
    /// Perimeter and area of the convex hull of the mask pixels.
    ConvexHull,
    /// `2 * (bbox_width + bbox_height)` with the raw pixel count as area.
    BoundingBox,
}

/// Immutable backend selection, probed once and injected into the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub pixel_backend: PixelBackend,
    pub perimeter_model: PerimeterModel,
}

impl Capabilities {
    pub fn detect(config: &MonitorConfig) -> Self {
        let pixel_backend = if config.allow_bulk_pixels {
            PixelBackend::Bulk
        } else {
            PixelBackend::Scalar
        };

        let perimeter_model = if cfg!(feature = "convex-hull") && config.allow_convex_hull {
            PerimeterModel::ConvexHull
        } else {
            PerimeterModel::BoundingBox
        };

        let capabilities = Self {
            pixel_backend,
            perimeter_model,
        };
        debug!(?capabilities, "Detected pixel capabilities");
        capabilities
    }

    pub fn scalar() -> Self {
        Self {
            pixel_backend: PixelBackend::Scalar,
            perimeter_model: PerimeterModel::BoundingBox,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect(&MonitorConfig::default())
    }
}

/// Read-only view over one cropped sub-image.
pub struct PixelView<'a> {
    image: &'a RgbImage,
    backend: PixelBackend,
}

impl<'a> PixelView<'a> {
    pub fn new(image: &'a RgbImage, backend: PixelBackend) -> Self {
        Self { image, backend }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn len(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn backend(&self) -> PixelBackend {
        self.backend
    }

    /// Row-major `(r, g, b)` triples using the selected backend.
    pub fn pixels(&self) -> Box<dyn Iterator<Item = [u8; 3]> + 'a> {
        let image = self.image;
        match self.backend {
            PixelBackend::Bulk => Box::new(
                image
                    .as_raw()
                    .chunks_exact(3)
                    .take(self.len())
                    .map(|px| [px[0], px[1], px[2]]),
            ),
            PixelBackend::Scalar => {
                let (width, height) = image.dimensions();
                Box::new(
                    (0..height)
                        .flat_map(move |y| (0..width).map(move |x| (x, y)))
                        .map(move |(x, y)| image.get_pixel(x, y).0),
                )
            }
        }
    }
}
