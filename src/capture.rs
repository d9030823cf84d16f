//! Screenshot sources consumed by the monitor.
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;
use tracing::debug;

use crate::error::{CaptureError, MonitorError};

/// Zero-argument capture capability supplied by the host.
pub trait ScreenshotProvider: Send + Sync {
    fn capture(&self) -> Result<DynamicImage, CaptureError>;
}

impl<F> ScreenshotProvider for F
where
    F: Fn() -> Result<DynamicImage, CaptureError> + Send + Sync,
{
    fn capture(&self) -> Result<DynamicImage, CaptureError> {
        self()
    }
}

/// Replays screenshots from disk, cycling through the list on every capture.
pub struct FileScreenshots {
    paths: Vec<PathBuf>,
    next: AtomicUsize,
}

impl FileScreenshots {
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, MonitorError> {
        if paths.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "at least one screenshot path is required".to_string(),
            ));
        }
        Ok(Self {
            paths,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl ScreenshotProvider for FileScreenshots {
    fn capture(&self) -> Result<DynamicImage, CaptureError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.paths.len();
        let path = &self.paths[idx];
        debug!(path = %path.display(), "Loading screenshot from disk");
        Ok(image::open(path)?)
    }
}
