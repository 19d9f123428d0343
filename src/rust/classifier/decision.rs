use serde::{Deserialize, Serialize};

use super::recycling::RecyclingGuidance;
use super::scoring::CategoryScores;
use super::signature::PlasticCategory;

/// The engine's verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: PlasticCategory,
    /// Relative strength of the winning category in `[0, 1]`. Not a calibrated probability.
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        Self {
            category: PlasticCategory::Unknown,
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == PlasticCategory::Unknown
    }

    pub fn guidance(&self) -> RecyclingGuidance {
        self.category.recycling_guidance()
    }
}

/// Picks the strictly-highest score that clears `threshold`, earliest in registry order on ties.
pub fn decide(scores: &CategoryScores, threshold: f32) -> ClassificationResult {
    let mut best_score = 0.0f32;
    let mut best_category = PlasticCategory::Unknown;

    for (category, score) in scores.iter() {
        if score > best_score && score >= threshold {
            best_score = score;
            best_category = category;
        }
    }

    if best_category == PlasticCategory::Unknown {
        return ClassificationResult::unknown();
    }

    ClassificationResult {
        category: best_category,
        confidence: best_score.clamp(0.0, 1.0),
    }
}
