use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

const ENV_PREFIX: &str = "BADGE_SENTINEL";

/// Every tunable of the badge detection pipeline. Built once, then shared
/// read-only by all stages of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub top_bar_y_start: f64,
    pub top_bar_y_end: f64,
    pub notification_regions: Vec<(f64, f64)>,
    pub message_regions: Vec<(f64, f64)>,

    pub pixel_ratio_threshold: f64,
    pub vivid_ratio_threshold: f64,
    pub hsv_ratio_threshold: f64,
    pub red_pixel_threshold: u32,
    pub vivid_pixel_threshold: u32,
    pub hsv_pixel_threshold: u32,
    pub circularity_threshold: f64,
    pub compactness_threshold: f64,
    pub cluster_threshold: u32,

    pub vote_required: u32,
    pub soft_vote_required: u32,

    pub min_attempts: u32,
    pub max_attempts: u32,
    pub attempt_delay_secs: f64,
    pub first_attempt_delay_secs: f64,

    pub heat_decay: f64,
    pub confidence_floor: f64,
    pub confidence_cap: f64,
    pub calibration_ramp: f64,

    pub allow_bulk_pixels: bool,
    pub allow_convex_hull: bool,
    pub enable_circularity: bool,
    pub enable_compactness: bool,
    pub enable_cluster_analysis: bool,
    pub debug_samples: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            top_bar_y_start: 0.03,
            top_bar_y_end: 0.20,
            notification_regions: vec![(0.58, 0.70), (0.60, 0.74), (0.62, 0.78)],
            message_regions: vec![(0.74, 0.92), (0.76, 0.94), (0.79, 0.97)],
            pixel_ratio_threshold: 0.003,
            vivid_ratio_threshold: 0.0015,
            hsv_ratio_threshold: 0.002,
            red_pixel_threshold: 18,
            vivid_pixel_threshold: 6,
            hsv_pixel_threshold: 8,
            circularity_threshold: 0.22,
            compactness_threshold: 0.16,
            cluster_threshold: 3,
            vote_required: 2,
            soft_vote_required: 1,
            min_attempts: 2,
            max_attempts: 4,
            attempt_delay_secs: 2.4,
            first_attempt_delay_secs: 3.0, // lets the top bar finish animating
            heat_decay: 0.85,
            confidence_floor: 0.35,
            confidence_cap: 0.96,
            calibration_ramp: 0.18,
            allow_bulk_pixels: true,
            allow_convex_hull: true,
            enable_circularity: true,
            enable_compactness: true,
            enable_cluster_analysis: true,
            debug_samples: false,
        }
    }
}

impl MonitorConfig {
    /// Layers defaults, an optional config file and `BADGE_SENTINEL__*`
    /// environment variables, then validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: MonitorConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), MonitorError> {
        let unit_fields = [
            ("top_bar_y_start", self.top_bar_y_start),
            ("top_bar_y_end", self.top_bar_y_end),
            ("pixel_ratio_threshold", self.pixel_ratio_threshold),
            ("vivid_ratio_threshold", self.vivid_ratio_threshold),
            ("hsv_ratio_threshold", self.hsv_ratio_threshold),
            ("compactness_threshold", self.compactness_threshold),
            ("confidence_floor", self.confidence_floor),
            ("confidence_cap", self.confidence_cap),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must be between 0.0 and 1.0, got {value}")));
            }
        }

        if self.confidence_floor > self.confidence_cap {
            return Err(invalid(format!(
                "confidence_floor ({}) exceeds confidence_cap ({})",
                self.confidence_floor, self.confidence_cap
            )));
        }

        if self.min_attempts == 0 {
            return Err(invalid("min_attempts must be greater than 0".to_string()));
        }

        if self.min_attempts > self.max_attempts {
            return Err(invalid(format!(
                "min_attempts ({}) exceeds max_attempts ({})",
                self.min_attempts, self.max_attempts
            )));
        }

        let delays = [
            ("attempt_delay_secs", self.attempt_delay_secs),
            ("first_attempt_delay_secs", self.first_attempt_delay_secs),
        ];
        for (name, value) in delays {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(invalid(format!(
                    "{name} must be a finite, non-negative number of seconds, got {value}"
                )));
            }
        }

        if !self.heat_decay.is_finite() || self.heat_decay < 0.0 {
            return Err(invalid(format!(
                "heat_decay must be finite and non-negative, got {}",
                self.heat_decay
            )));
        }

        if !self.calibration_ramp.is_finite() {
            return Err(invalid(format!(
                "calibration_ramp must be finite, got {}",
                self.calibration_ramp
            )));
        }

        if self.notification_regions.is_empty() || self.message_regions.is_empty() {
            return Err(invalid("each channel needs at least one region".to_string()));
        }

        Ok(())
    }

    pub fn attempt_delay(&self) -> Duration {
        Duration::from_secs_f64(self.attempt_delay_secs.max(0.0))
    }

    pub fn first_attempt_delay(&self) -> Duration {
        Duration::from_secs_f64(self.first_attempt_delay_secs.max(0.0))
    }

    /// Shape analysis is skipped entirely when neither shape vote can fire.
    pub fn needs_shape_analysis(&self) -> bool {
        self.enable_circularity || self.enable_compactness
    }

    pub fn with_debug_samples(mut self, enabled: bool) -> Self {
        self.debug_samples = enabled;
        self
    }

    pub fn with_delays(mut self, first: Duration, between: Duration) -> Self {
        self.first_attempt_delay_secs = first.as_secs_f64();
        self.attempt_delay_secs = between.as_secs_f64();
        self
    }

    pub fn with_attempts(mut self, min: u32, max: u32) -> Self {
        self.min_attempts = min;
        self.max_attempts = max;
        self
    }
}

fn invalid(message: String) -> MonitorError {
    MonitorError::InvalidConfig(message)
}
