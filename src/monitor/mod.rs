pub mod heat;
pub mod report;
pub mod stage;

pub use heat::HeatTracker;
pub use report::{describe_decision, Report};
pub use stage::{DetectionStage, StageMark, StageRecorder};

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::capture::ScreenshotProvider;
use crate::config::MonitorConfig;
use crate::detection::evaluator::{BadgeDecision, HeuristicEvaluator};
use crate::detection::pixels::Capabilities;
use crate::detection::region::{as_regions, Channel, RegionSet};
use crate::detection::sample::{BadgeSample, SampleCollector};
use crate::error::{CaptureError, MonitorError};

/// Every attempt waits at least this long, even with a zero configured delay.
const MIN_ATTEMPT_DELAY: Duration = Duration::from_millis(10);

/// Runs capture attempts, pools region samples and turns them into a report.
///
/// Holds only immutable state; `scan` may be called from several threads at
/// once.
pub struct NotificationMonitor {
    config: MonitorConfig,
    regions: RegionSet,
    capabilities: Capabilities,
    collector: SampleCollector,
}

impl NotificationMonitor {
    /// Validates the configuration and every region, and probes pixel
    /// capabilities once.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let regions = as_regions(&config);
        regions.validate()?;

        let capabilities = Capabilities::detect(&config);
        let collector = SampleCollector::new(&config, capabilities);

        info!(
            notification_regions = regions.notifications.len(),
            message_regions = regions.messages.len(),
            ?capabilities,
            "Notification monitor ready"
        );

        Ok(Self {
            config,
            regions,
            capabilities,
            collector,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// One stateless scan. Confidences are not smoothed against earlier scans.
    pub fn scan(&self, provider: &dyn ScreenshotProvider, attempts: Option<u32>) -> Report {
        self.scan_with_heat(provider, attempts, &mut HeatTracker::new())
    }

    /// Like [`scan`](Self::scan), blending the reported confidences into a
    /// caller-held [`HeatTracker`].
    #[instrument(skip(self, provider, heat), fields(scan_id = tracing::field::Empty))]
    pub fn scan_with_heat(
        &self,
        provider: &dyn ScreenshotProvider,
        attempts: Option<u32>,
        heat: &mut HeatTracker,
    ) -> Report {
        let started = Instant::now();
        let scan_id = Uuid::new_v4();
        tracing::Span::current().record("scan_id", tracing::field::display(scan_id));

        let mut stages = StageRecorder::new();
        stages.mark(DetectionStage::Prepare);

        let attempts = attempts
            .unwrap_or(self.config.max_attempts)
            .max(self.config.min_attempts);
        let mut pooled: IndexMap<Channel, Vec<BadgeSample>> =
            Channel::ALL.iter().map(|&c| (c, Vec::new())).collect();
        let mut capture_failures = 0u32;
        let mut notes = Vec::new();

        for attempt in 0..attempts {
            stages.mark(DetectionStage::Capture);
            let delay = if attempt == 0 {
                self.config.first_attempt_delay()
            } else {
                self.config.attempt_delay()
            };
            thread::sleep(delay.max(MIN_ATTEMPT_DELAY));

            let image = match capture(provider) {
                Ok(image) => image,
                Err(err) => {
                    capture_failures += 1;
                    warn!(attempt, error = %err, "Screenshot capture failed");
                    notes.push(format!("attempt#{attempt} failed to capture screenshot: {err}"));
                    continue;
                }
            };

            stages.mark(DetectionStage::LocateRegions);
            match self.collect_attempt(&image) {
                Ok(samples) => {
                    debug!(attempt, samples = samples.len(), "Collected attempt samples");
                    for sample in samples {
                        pooled
                            .entry(sample.region.channel)
                            .or_default()
                            .push(sample);
                    }
                }
                Err(err) => {
                    capture_failures += 1;
                    warn!(
                        attempt,
                        width = image.width(),
                        height = image.height(),
                        error = %err,
                        "Screenshot too small for configured regions"
                    );
                    notes.push(format!("attempt#{attempt} could not be sampled: {err}"));
                }
            }
        }

        stages.mark(DetectionStage::AnalyzeBadges);
        let evaluator = HeuristicEvaluator::new(&self.config);
        let decisions: IndexMap<Channel, BadgeDecision> = pooled
            .into_iter()
            .map(|(channel, samples)| (channel, evaluator.evaluate(channel, samples)))
            .collect();

        stages.mark(DetectionStage::Aggregate);
        let mut verdict = |channel: Channel| -> (bool, f64) {
            let decision = &decisions[&channel];
            let blended = heat.update(channel, decision.confidence);
            (decision.has_signal, blended.min(1.0))
        };
        let (has_notifications, notification_confidence) = verdict(Channel::Notifications);
        let (has_messages, message_confidence) = verdict(Channel::Messages);

        stages.mark(DetectionStage::Complete);
        let duration_seconds = started.elapsed().as_secs_f64();

        info!(
            has_notifications,
            notification_confidence,
            has_messages,
            message_confidence,
            attempts,
            capture_failures,
            duration_ms = (duration_seconds * 1000.0) as u64,
            "Badge scan complete"
        );

        Report {
            scan_id,
            has_notifications,
            has_messages,
            notification_confidence,
            message_confidence,
            duration_seconds,
            attempts,
            stage_trace: stages.into_trace(),
            decisions,
            capture_failures,
            notes,
            capabilities: self.capabilities,
        }
    }

    /// Samples every region of both channels, or none at all.
    fn collect_attempt(&self, image: &DynamicImage) -> Result<Vec<BadgeSample>, MonitorError> {
        self.regions
            .iter()
            .map(|region| self.collector.collect(image, region))
            .collect()
    }
}

/// Calls the provider, turning panics and empty images into capture errors.
fn capture(provider: &dyn ScreenshotProvider) -> Result<DynamicImage, CaptureError> {
    let image = panic::catch_unwind(AssertUnwindSafe(|| provider.capture()))
        .map_err(|_| CaptureError::Unavailable("screenshot provider panicked".to_string()))??;

    if image.width() == 0 || image.height() == 0 {
        return Err(CaptureError::Empty {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(image)
}
