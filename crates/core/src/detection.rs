//! Detections returned by the inference capability and the fall classifier
//! that judges them.
//!
//! The classifier is a heuristic proxy: any sufficiently confident
//! `"person"` detection counts as a fall, regardless of pose. Ordinary
//! standing or walking people are therefore flagged too. This is a known
//! limitation, kept because detections carry no posture signal.

use serde::{Deserialize, Serialize};

/// Label the classifier looks for.
pub const PERSON_LABEL: &str = "person";

/// Default minimum score (exclusive) for a person detection to count.
pub const DEFAULT_FALL_THRESHOLD: f64 = 0.5;

/// Alert `type` written for a positive judgment.
pub const FALL_ALERT_TYPE: &str = "Fall Detected";

/// One labeled, scored object found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Outcome of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FallJudgment {
    pub is_fall: bool,
    /// Highest qualifying person score, `0.0` when `is_fall` is false.
    pub confidence: f64,
}

impl FallJudgment {
    pub const NO_FALL: FallJudgment = FallJudgment {
        is_fall: false,
        confidence: 0.0,
    };
}

/// Turns a frame's detection set into a [`FallJudgment`].
#[derive(Debug, Clone, Copy)]
pub struct FallClassifier {
    threshold: f64,
}

impl FallClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, detections: &[Detection]) -> FallJudgment {
        detections
            .iter()
            .filter(|d| d.label == PERSON_LABEL && d.score > self.threshold)
            .map(|d| d.score)
            .fold(None, |best: Option<f64>, score| {
                Some(best.map_or(score, |b| b.max(score)))
            })
            .map_or(FallJudgment::NO_FALL, |confidence| FallJudgment {
                is_fall: true,
                confidence,
            })
    }
}

impl Default for FallClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FALL_THRESHOLD)
    }
}
