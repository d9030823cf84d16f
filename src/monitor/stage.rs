use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Coarse-grained stages of one scan, in their only legal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStage {
    Prepare,
    Capture,
    LocateRegions,
    AnalyzeBadges,
    Aggregate,
    Complete,
}

impl DetectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStage::Prepare => "PREPARE",
            DetectionStage::Capture => "CAPTURE",
            DetectionStage::LocateRegions => "LOCATE_REGIONS",
            DetectionStage::AnalyzeBadges => "ANALYZE_BADGES",
            DetectionStage::Aggregate => "AGGREGATE",
            DetectionStage::Complete => "COMPLETE",
        }
    }

    /// Whether `self` may be recorded right after `previous`.
    ///
    /// Capture repeats once per attempt and is followed by LocateRegions only
    /// when the capture produced an image.
    pub fn can_follow(&self, previous: Option<DetectionStage>) -> bool {
        use DetectionStage::*;
        matches!(
            (previous, self),
            (None, Prepare)
                | (Some(Prepare), Capture)
                | (Some(Capture), Capture)
                | (Some(LocateRegions), Capture)
                | (Some(Capture), LocateRegions)
                | (Some(Capture), AnalyzeBadges)
                | (Some(LocateRegions), AnalyzeBadges)
                | (Some(AnalyzeBadges), Aggregate)
                | (Some(Aggregate), Complete)
        )
    }
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageMark {
    pub stage: DetectionStage,
    pub at: DateTime<Utc>,
}

/// Ordered, timestamped stage timeline for one scan.
#[derive(Debug, Clone, Default)]
pub struct StageRecorder {
    marks: Vec<StageMark>,
}

impl StageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<DetectionStage> {
        self.marks.last().map(|m| m.stage)
    }

    /// Appends `stage` if it is a legal successor. An out-of-order mark is
    /// dropped and logged; the timeline never contains an illegal sequence.
    pub fn mark(&mut self, stage: DetectionStage) -> bool {
        let previous = self.current();
        if !stage.can_follow(previous) {
            warn!(?previous, %stage, "Rejected out-of-order detection stage");
            return false;
        }
        self.marks.push(StageMark {
            stage,
            at: Utc::now(),
        });
        true
    }

    pub fn is_complete(&self) -> bool {
        self.current() == Some(DetectionStage::Complete)
    }

    pub fn count(&self, stage: DetectionStage) -> usize {
        self.marks.iter().filter(|m| m.stage == stage).count()
    }

    pub fn into_trace(self) -> Vec<StageMark> {
        self.marks
    }
}
