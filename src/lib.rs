pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod monitor;

pub use capture::{FileScreenshots, ScreenshotProvider};
pub use config::MonitorConfig;
pub use detection::{BadgeDecision, BadgeRegion, BadgeSample, Channel};
pub use error::{CaptureError, MonitorError};
pub use monitor::{describe_decision, DetectionStage, HeatTracker, NotificationMonitor, Report};
