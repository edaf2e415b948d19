//! Text preparation: markup normalization and segmentation.

mod normalize;
mod segment;

pub use normalize::normalize;
pub use segment::{Segment, SpeechPlan, plan, segment};
