use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::stage::StageMark;
use crate::detection::evaluator::BadgeDecision;
use crate::detection::pixels::Capabilities;
use crate::detection::region::Channel;
use crate::detection::sample::BadgeSample;

/// Final outcome of one scan. Returned to the caller, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scan_id: Uuid,
    pub has_notifications: bool,
    pub has_messages: bool,
    pub notification_confidence: f64,
    pub message_confidence: f64,
    pub duration_seconds: f64,
    pub attempts: u32,
    pub stage_trace: Vec<StageMark>,
    pub decisions: IndexMap<Channel, BadgeDecision>,
    pub capture_failures: u32,
    pub notes: Vec<String>,
    pub capabilities: Capabilities,
}

impl Report {
    pub fn decision(&self, channel: Channel) -> Option<&BadgeDecision> {
        self.decisions.get(&channel)
    }

    pub fn describe(&self) -> Value {
        describe_decision(self)
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn unix_seconds(at: &DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn describe_sample(sample: &BadgeSample) -> Value {
    json!({
        "region": sample.region.channel.as_str(),
        "bounds": sample.region.bounds(),
        "size": [sample.size.0, sample.size.1],
        "red": sample.red_pixels,
        "vivid": sample.vivid_pixels,
        "hsv": sample.hsv_pixels,
        "ratio": round(sample.red_ratio, 5),
        "vivid_ratio": round(sample.vivid_ratio, 5),
        "hsv_ratio": round(sample.hsv_ratio, 5),
        "circularity": round(sample.circularity, 5),
        "compactness": round(sample.compactness, 5),
        "clusters": sample.cluster_count,
        "sample_time": unix_seconds(&sample.captured_at),
    })
}

fn describe_channel(decision: &BadgeDecision) -> Value {
    let scores = &decision.scores;
    json!({
        "confidence": round(decision.confidence, 4),
        "has_notification": decision.has_signal,
        "score_red": round(scores.score_red, 4),
        "score_vivid": round(scores.score_vivid, 4),
        "score_hsv": round(scores.score_hsv, 4),
        "score_shape": round(scores.score_shape, 4),
        "score_compact": round(scores.score_compact, 4),
        "score_cluster": round(scores.score_cluster, 4),
        "overall": round(scores.overall, 4),
        "signal": scores.has_signal,
        "reasons": decision.reasoning,
        "samples": scores
            .supporting_samples
            .iter()
            .map(describe_sample)
            .collect::<Vec<_>>(),
    })
}

/// Plain, rounded, JSON-ready rendering of a report for logging/telemetry.
pub fn describe_decision(report: &Report) -> Value {
    let decisions: serde_json::Map<String, Value> = report
        .decisions
        .iter()
        .map(|(channel, decision)| (channel.as_str().to_string(), describe_channel(decision)))
        .collect();

    let stages: Vec<Value> = report
        .stage_trace
        .iter()
        .map(|mark| json!([mark.stage.as_str(), unix_seconds(&mark.at)]))
        .collect();

    json!({
        "scan_id": report.scan_id.to_string(),
        "has_notifications": report.has_notifications,
        "has_messages": report.has_messages,
        "notification_confidence": round(report.notification_confidence, 4),
        "message_confidence": round(report.message_confidence, 4),
        "duration": round(report.duration_seconds, 3),
        "attempts": report.attempts,
        "capture_failures": report.capture_failures,
        "notes": report.notes,
        "stages": stages,
        "decisions": Value::Object(decisions),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_places() {
        assert_eq!(round(0.123456, 4), 0.1235);
        assert_eq!(round(1.0 / 3.0, 3), 0.333);
        assert_eq!(round(0.35, 4), 0.35);
    }
}
