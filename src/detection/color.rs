use serde::Serialize;

use super::pixels::PixelView;

/// Upper bound of the low hue wrap-around band for badge red.
const HUE_LOW_MAX: f32 = 0.08;
/// Lower bound of the high hue wrap-around band for badge red.
const HUE_HIGH_MIN: f32 = 0.92;
const HSV_MIN_SATURATION: f32 = 0.35;
const HSV_MIN_VALUE: f32 = 0.35;
const VIVID_MIN_SATURATION: f32 = 0.55;
const VIVID_MIN_VALUE: f32 = 0.40;

/// Pixel counts and channel means for one crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ColorStats {
    pub red_count: u32,
    pub vivid_count: u32,
    pub hsv_count: u32,
    pub mean_saturation: f32,
    pub mean_value: f32,
    pub mean_hue: f32,
}

/// Hue, saturation and value, each in [0, 1]; hue is in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let r = r as f32 / 255.0;
        let g = g as f32 / 255.0;
        let b = b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let saturation = if max == 0.0 { 0.0 } else { delta / max };
        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Self {
            hue: (hue / 6.0).rem_euclid(1.0),
            saturation,
            value: max,
        }
    }
}

/// r > 180, g < 120, b < 130. Also the foreground test for shape analysis.
pub fn is_badge_red([r, g, b]: [u8; 3]) -> bool {
    r > 180 && g < 120 && b < 130
}

/// Red test plus a saturated, bright HSV profile.
pub fn is_vivid_red(rgb: [u8; 3], hsv: &Hsv) -> bool {
    is_badge_red(rgb) && hsv.saturation > VIVID_MIN_SATURATION && hsv.value > VIVID_MIN_VALUE
}

/// Hue near the red wrap-around with enough saturation and value.
pub fn is_hsv_red(hsv: &Hsv) -> bool {
    (hsv.hue <= HUE_LOW_MAX || hsv.hue >= HUE_HIGH_MIN)
        && hsv.saturation > HSV_MIN_SATURATION
        && hsv.value > HSV_MIN_VALUE
}

/// Counts badge-red pixels under three independent color tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorClassifier;

impl ColorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, view: &PixelView<'_>) -> ColorStats {
        let mut stats = ColorStats::default();
        let mut saturation_sum = 0.0f64;
        let mut value_sum = 0.0f64;
        let mut hue_sum = 0.0f64;
        let mut n = 0u32;

        for rgb in view.pixels() {
            let hsv = Hsv::from_rgb(rgb);

            if is_badge_red(rgb) {
                stats.red_count += 1;
                if is_vivid_red(rgb, &hsv) {
                    stats.vivid_count += 1;
                }
            }
            if is_hsv_red(&hsv) {
                stats.hsv_count += 1;
            }

            saturation_sum += hsv.saturation as f64;
            value_sum += hsv.value as f64;
            hue_sum += hsv.hue as f64;
            n += 1;
        }

        let n = n.max(1) as f64;
        stats.mean_saturation = (saturation_sum / n) as f32;
        stats.mean_value = (value_sum / n) as f32;
        stats.mean_hue = (hue_sum / n) as f32;
        stats
    }
}
