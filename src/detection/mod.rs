//! Per-region badge measurement and per-channel voting.
pub mod color;
pub mod evaluator;
pub mod pixels;
pub mod region;
pub mod sample;
pub mod shape;

pub use color::{ColorClassifier, ColorStats};
pub use evaluator::{BadgeDecision, HeuristicEvaluator, HeuristicScores, VoteTally};
pub use pixels::{Capabilities, PerimeterModel, PixelBackend, PixelView};
pub use region::{as_regions, BadgeRegion, Channel, RegionSet};
pub use sample::{BadgeSample, SampleCollector};
pub use shape::{ShapeAnalyzer, ShapeFeatures};
