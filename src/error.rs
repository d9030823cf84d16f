use thiserror::Error;

use crate::detection::region::Channel;

// Main Library Error Type

#[derive(Error, Debug)]
pub enum MonitorError {
    /// `bounds` is `[x_start, y_start, x_end, y_end]` as fractions.
    #[error("Invalid {channel} region bounds {bounds:?}")]
    InvalidRegion { channel: Channel, bounds: [f64; 4] },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Screenshot Capture Error Type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screenshot unavailable: {0}")]
    Unavailable(String),
    #[error("Screenshot is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("Failed to decode screenshot: {0}")]
    Image(#[from] image::ImageError),
}
