//! Weighted heuristic voting over a pooled batch of samples.
use serde::Serialize;
use tracing::debug;

use super::region::Channel;
use super::sample::BadgeSample;
use crate::config::MonitorConfig;

/// Vote weights, in order: red, vivid, hsv, shape, compact, cluster.
pub const VOTE_WEIGHTS: [f64; 6] = [0.24, 0.22, 0.22, 0.12, 0.10, 0.10];
/// Ceiling applied to the per-sample weighted score before decay.
const NORMALIZED_CAP: f64 = 1.25;

/// Vote counts for one batch, summed across every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub red: u32,
    pub vivid: u32,
    pub hsv: u32,
    pub shape: u32,
    pub compact: u32,
    pub cluster: u32,
}

impl VoteTally {
    fn as_array(&self) -> [u32; 6] {
        [
            self.red,
            self.vivid,
            self.hsv,
            self.shape,
            self.compact,
            self.cluster,
        ]
    }

    pub fn total(&self) -> u32 {
        self.as_array().iter().sum()
    }

    pub fn weighted(&self) -> f64 {
        self.as_array()
            .iter()
            .zip(VOTE_WEIGHTS)
            .map(|(&votes, weight)| votes as f64 * weight)
            .sum()
    }

    fn summary(&self) -> String {
        format!(
            "red={} vivid={} hsv={} shape={} compact={} cluster={}",
            self.red, self.vivid, self.hsv, self.shape, self.compact, self.cluster
        )
    }
}

/// Per-channel aggregate of the six heuristics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicScores {
    pub votes: VoteTally,
    pub score_red: f64,
    pub score_vivid: f64,
    pub score_hsv: f64,
    pub score_shape: f64,
    pub score_compact: f64,
    pub score_cluster: f64,
    pub overall: f64,
    pub has_signal: bool,
    pub supporting_samples: Vec<BadgeSample>,
}

/// Verdict for one channel in one scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeDecision {
    pub channel: Channel,
    pub confidence: f64,
    pub has_signal: bool,
    pub scores: HeuristicScores,
    pub reasoning: Vec<String>,
}

impl BadgeDecision {
    pub fn sample_count(&self) -> usize {
        self.scores.supporting_samples.len()
    }
}

pub struct HeuristicEvaluator<'a> {
    config: &'a MonitorConfig,
}

impl<'a> HeuristicEvaluator<'a> {
    pub fn new(config: &'a MonitorConfig) -> Self {
        Self { config }
    }

    fn tally(&self, sample: &BadgeSample) -> VoteTally {
        let c = self.config;
        VoteTally {
            red: (sample.red_pixels >= c.red_pixel_threshold
                || sample.red_ratio >= c.pixel_ratio_threshold) as u32,
            vivid: (sample.vivid_pixels >= c.vivid_pixel_threshold
                || sample.vivid_ratio >= c.vivid_ratio_threshold) as u32,
            hsv: (sample.hsv_pixels >= c.hsv_pixel_threshold
                || sample.hsv_ratio >= c.hsv_ratio_threshold) as u32,
            shape: (c.enable_circularity && sample.circularity >= c.circularity_threshold) as u32,
            compact: (c.enable_compactness && sample.compactness >= c.compactness_threshold) as u32,
            cluster: (c.enable_cluster_analysis && sample.cluster_count <= c.cluster_threshold)
                as u32,
        }
    }

    /// Continuous confidence in `[confidence_floor, confidence_cap]`. An empty
    /// or vote-less batch lands exactly on the floor.
    pub fn confidence(&self, votes: &VoteTally, sample_count: usize) -> f64 {
        let normalized = (votes.weighted() / sample_count.max(1) as f64).min(NORMALIZED_CAP);
        let heat = normalized * self.config.heat_decay;
        (heat + self.config.calibration_ramp)
            .max(self.config.confidence_floor)
            .min(self.config.confidence_cap)
    }

    /// Discrete gate on the color votes alone.
    pub fn has_signal(&self, votes: &VoteTally) -> bool {
        let required = self.config.vote_required;
        (votes.red >= required && votes.vivid >= self.config.soft_vote_required)
            || votes.vivid >= required
            || votes.hsv >= required
    }

    pub fn evaluate(&self, channel: Channel, samples: Vec<BadgeSample>) -> BadgeDecision {
        let mut votes = VoteTally::default();
        let mut reasoning = Vec::new();

        for (idx, sample) in samples.iter().enumerate() {
            let v = self.tally(sample);
            votes.red += v.red;
            votes.vivid += v.vivid;
            votes.hsv += v.hsv;
            votes.shape += v.shape;
            votes.compact += v.compact;
            votes.cluster += v.cluster;

            if self.config.debug_samples {
                reasoning.push(format!(
                    "sample#{idx} red={} ({:.4}) vivid={} ({:.4}) hsv={} ({:.4}) circ={:.4} compact={:.4} clusters={}",
                    sample.red_pixels,
                    sample.red_ratio,
                    sample.vivid_pixels,
                    sample.vivid_ratio,
                    sample.hsv_pixels,
                    sample.hsv_ratio,
                    sample.circularity,
                    sample.compactness,
                    sample.cluster_count,
                ));
            }
        }

        let n = samples.len().max(1) as f64;
        let confidence = self.confidence(&votes, samples.len());
        let has_signal = self.has_signal(&votes);

        reasoning.push(if has_signal {
            format!("detected via votes {}", votes.summary())
        } else {
            format!("insufficient votes {}", votes.summary())
        });

        debug!(
            %channel,
            samples = samples.len(),
            total_votes = votes.total(),
            confidence,
            has_signal,
            "Evaluated badge channel"
        );

        BadgeDecision {
            channel,
            confidence,
            has_signal,
            scores: HeuristicScores {
                votes,
                score_red: votes.red as f64 / n,
                score_vivid: votes.vivid as f64 / n,
                score_hsv: votes.hsv as f64 / n,
                score_shape: votes.shape as f64 / n,
                score_compact: votes.compact as f64 / n,
                score_cluster: votes.cluster as f64 / n,
                overall: confidence,
                has_signal,
                supporting_samples: samples,
            },
            reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::color::ColorStats;
    use crate::detection::region::BadgeRegion;
    use crate::detection::shape::ShapeFeatures;

    fn region() -> BadgeRegion {
        BadgeRegion::new(Channel::Notifications, 0.6, 0.7, 0.03, 0.2)
    }

    fn sample(red: u32, vivid: u32, hsv: u32, shape: ShapeFeatures) -> BadgeSample {
        BadgeSample::from_measurements(
            region(),
            (100, 100),
            ColorStats {
                red_count: red,
                vivid_count: vivid,
                hsv_count: hsv,
                ..ColorStats::default()
            },
            shape,
        )
    }

    fn badge_shape() -> ShapeFeatures {
        ShapeFeatures {
            circularity: 0.9,
            compactness: 0.8,
            cluster_count: 1,
        }
    }

    #[test]
    fn weights_sum_to_one() {
        assert!((VOTE_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_batch_sits_on_floor_without_signal() {
        let config = MonitorConfig::default();
        let decision = HeuristicEvaluator::new(&config).evaluate(Channel::Messages, Vec::new());
        assert_eq!(decision.confidence, config.confidence_floor);
        assert!(!decision.has_signal);
        assert_eq!(decision.sample_count(), 0);
        assert_eq!(decision.scores.votes, VoteTally::default());
    }

    #[test]
    fn no_evidence_and_weak_evidence_share_the_floor() {
        // Floor is applied unconditionally: a lone cluster vote (0.10 * 0.85 + 0.18)
        // stays under 0.35 and is indistinguishable from zero votes.
        let config = MonitorConfig::default();
        let evaluator = HeuristicEvaluator::new(&config);
        let none = evaluator.confidence(&VoteTally::default(), 3);
        let weak = evaluator.confidence(
            &VoteTally {
                cluster: 3,
                ..VoteTally::default()
            },
            3,
        );
        assert_eq!(none, config.confidence_floor);
        assert_eq!(weak, config.confidence_floor);
    }

    #[test]
    fn shape_only_votes_raise_confidence_without_signal() {
        let config = MonitorConfig::default();
        let samples = vec![sample(0, 0, 0, badge_shape()); 6];
        let decision = HeuristicEvaluator::new(&config).evaluate(Channel::Notifications, samples);

        assert_eq!(decision.scores.votes.shape, 6);
        assert_eq!(decision.scores.votes.compact, 6);
        assert_eq!(decision.scores.votes.cluster, 6);
        assert!(!decision.has_signal);
        assert!(decision.confidence >= config.confidence_floor);
        // (0.12 + 0.10 + 0.10) * 0.85 + 0.18
        assert!((decision.confidence - 0.452).abs() < 1e-9);
    }

    #[test]
    fn strong_batch_is_capped() {
        let config = MonitorConfig::default();
        let samples = vec![sample(400, 400, 400, badge_shape()); 3];
        let decision = HeuristicEvaluator::new(&config).evaluate(Channel::Notifications, samples);

        assert!(decision.has_signal);
        // 1.0 * 0.85 + 0.18 = 1.03 -> capped
        assert_eq!(decision.confidence, config.confidence_cap);
        assert_eq!(decision.scores.score_red, 1.0);
        assert_eq!(decision.scores.overall, decision.confidence);
    }

    #[test]
    fn confidence_stays_within_bounds() {
        let config = MonitorConfig::default();
        let evaluator = HeuristicEvaluator::new(&config);
        for red in 0..4 {
            for shape in 0..4 {
                for n in 0..4usize {
                    let votes = VoteTally {
                        red,
                        vivid: red,
                        hsv: red,
                        shape,
                        compact: shape,
                        cluster: shape,
                    };
                    let c = evaluator.confidence(&votes, n);
                    assert!(c >= config.confidence_floor && c <= config.confidence_cap);
                }
            }
        }
    }

    #[test]
    fn signal_gate_rules() {
        let config = MonitorConfig::default();
        let evaluator = HeuristicEvaluator::new(&config);
        let gate = |red, vivid, hsv| {
            evaluator.has_signal(&VoteTally {
                red,
                vivid,
                hsv,
                ..VoteTally::default()
            })
        };

        assert!(gate(2, 1, 0));
        assert!(!gate(2, 0, 0));
        assert!(gate(0, 2, 0));
        assert!(gate(0, 0, 2));
        assert!(!gate(1, 1, 1));
    }

    #[test]
    fn ratio_threshold_alone_can_cast_a_vote() {
        let config = MonitorConfig {
            red_pixel_threshold: 1_000,
            ..MonitorConfig::default()
        };
        // 5 / 1000 px = 0.005 >= 0.003
        let mut s = sample(5, 0, 0, ShapeFeatures::default());
        s.size = (40, 25);
        s.red_ratio = 5.0 / 1000.0;
        let decision = HeuristicEvaluator::new(&config).evaluate(Channel::Messages, vec![s]);
        assert_eq!(decision.scores.votes.red, 1);
    }

    #[test]
    fn disabled_heuristics_never_vote() {
        let config = MonitorConfig {
            enable_circularity: false,
            enable_compactness: false,
            enable_cluster_analysis: false,
            ..MonitorConfig::default()
        };
        let decision = HeuristicEvaluator::new(&config)
            .evaluate(Channel::Notifications, vec![sample(0, 0, 0, badge_shape())]);
        assert_eq!(decision.scores.votes.total(), 0);
    }

    #[test]
    fn reasoning_lists_samples_only_in_debug_mode() {
        let samples = vec![sample(30, 30, 30, badge_shape()); 2];

        let quiet = MonitorConfig::default();
        let decision = HeuristicEvaluator::new(&quiet).evaluate(Channel::Notifications, samples.clone());
        assert_eq!(decision.reasoning.len(), 1);
        assert!(decision.reasoning[0].starts_with("detected via votes red=2"));

        let verbose = MonitorConfig::default().with_debug_samples(true);
        let decision = HeuristicEvaluator::new(&verbose).evaluate(Channel::Notifications, samples);
        assert_eq!(decision.reasoning.len(), 3);
        assert!(decision.reasoning[0].starts_with("sample#0 red=30"));
    }
}
