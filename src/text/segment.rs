//! Paragraph segmentation and short/long path planning.

use crate::config::SegmenterConfig;
use regex::Regex;
use std::sync::LazyLock;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("static blank-line pattern"));

/// One speakable chunk of normalized text, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the session.
    pub index: usize,
    /// Trimmed, non-empty text.
    pub text: String,
}

/// How a session synthesizes its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechPlan {
    /// One synthesis call for the whole text.
    Short(Segment),
    /// First segment up front, the rest in the background.
    Long(Vec<Segment>),
}

impl SpeechPlan {
    /// All segments of the plan, in order.
    pub fn segments(&self) -> &[Segment] {
        match self {
            Self::Short(segment) => std::slice::from_ref(segment),
            Self::Long(segments) => segments,
        }
    }

    /// Whether the plan uses background synthesis.
    pub fn is_progressive(&self) -> bool {
        matches!(self, Self::Long(_))
    }
}

/// Split normalized text on blank lines, dropping whitespace-only pieces.
pub fn segment(text: &str) -> Vec<Segment> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(index, piece)| Segment {
            index,
            text: piece.to_owned(),
        })
        .collect()
}

/// Decide how normalized `text` should be synthesized.
///
/// Returns `None` when there is nothing to speak. Short texts are spoken as a
/// single segment holding the whole text so no paragraph is lost.
pub fn plan(text: &str, config: &SegmenterConfig) -> Option<SpeechPlan> {
    let segments = segment(text);
    if segments.is_empty() {
        return None;
    }

    let short = segments.len() <= config.max_short_segments
        || text.chars().count() < config.long_text_threshold;
    if short {
        return Some(SpeechPlan::Short(Segment {
            index: 0,
            text: text.trim().to_owned(),
        }));
    }
    Some(SpeechPlan::Long(segments))
}
