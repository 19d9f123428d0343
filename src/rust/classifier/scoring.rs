use serde::{Deserialize, Serialize};

use super::properties::ImageStatistics;
use super::signature::{signatures, CategorySignature, PlasticCategory, Texture, Transparency};

/// One `(label, probability)` pair produced by the recognition model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionLabel {
    pub label: String,
    pub probability: f32,
}

impl RecognitionLabel {
    /// Creates a label, clamping the probability into `[0, 1]`.
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Weights blending model-driven and heuristic evidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier per keyword hit, scaled by the label probability
    pub keyword_weight: f32,
    /// Bonus when the category's transparency agrees with the image
    pub transparency_bonus: f32,
    /// Bonus when the category's texture agrees with the image
    pub texture_bonus: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_weight: 0.3,
            transparency_bonus: 0.3,
            texture_bonus: 0.2,
        }
    }
}

impl ScoringWeights {
    pub(crate) fn is_valid(&self) -> bool {
        [self.keyword_weight, self.transparency_bonus, self.texture_bonus]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Per-category scores of one classification, in registry order.
///
/// Scores are independent of each other and may exceed 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScores {
    entries: Vec<(PlasticCategory, f32)>,
}

impl CategoryScores {
    pub fn get(&self, category: PlasticCategory) -> Option<f32> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlasticCategory, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(PlasticCategory, f32)> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = (PlasticCategory, f32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Scores every registered category against the recognition labels and image statistics.
pub fn score_categories(
    labels: &[RecognitionLabel],
    stats: &ImageStatistics,
    weights: &ScoringWeights,
) -> CategoryScores {
    let lowered: Vec<(String, f32)> = labels
        .iter()
        .map(|l| (l.label.to_lowercase(), l.probability))
        .collect();

    signatures()
        .map(|signature| (signature.category, score_signature(signature, &lowered, stats, weights)))
        .collect()
}

fn score_signature(
    signature: &CategorySignature,
    lowered_labels: &[(String, f32)],
    stats: &ImageStatistics,
    weights: &ScoringWeights,
) -> f32 {
    let keyword_term: f32 = lowered_labels
        .iter()
        .map(|(label, probability)| {
            let hits = signature
                .keywords
                .iter()
                .filter(|keyword| label.contains(**keyword))
                .count();
            hits as f32 * probability * weights.keyword_weight
        })
        .sum();

    let profile = &signature.visual_profile;
    let mut visual_term = 0.0;
    let transparency_agrees = match profile.transparency {
        Transparency::High => stats.is_transparent,
        Transparency::Low => stats.is_opaque,
        Transparency::Medium => false,
    };
    if transparency_agrees {
        visual_term += weights.transparency_bonus;
    }
    let texture_agrees = match profile.texture {
        Texture::Smooth => !stats.has_texture,
        Texture::Rigid => stats.has_texture,
        Texture::Matte | Texture::Flexible => false,
    };
    if texture_agrees {
        visual_term += weights.texture_bonus;
    }

    (keyword_term + visual_term) * signature.base_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(is_transparent: bool, is_opaque: bool, has_texture: bool) -> ImageStatistics {
        ImageStatistics {
            transparency_ratio: if is_transparent { 0.9 } else { 0.1 },
            average_brightness: if is_opaque { 0.3 } else { 0.9 },
            texture_variation: if has_texture { 0.3 } else { 0.0 },
            is_transparent,
            is_opaque,
            has_texture,
        }
    }

    #[test]
    fn test_keyword_hits_are_counted_per_keyword() {
        let labels = vec![RecognitionLabel::new("Water Bottle", 1.0)];
        let scores = score_categories(&labels, &stats(false, false, true), &ScoringWeights::default());
        // "bottle" and "water bottle" both match
        let expected = 2.0 * 1.0 * 0.3 * 0.7;
        assert!((scores.get(PlasticCategory::Pet).unwrap() - expected).abs() < 1e-6);
        // HDPE only has "bottle"
        let expected = 1.0 * 0.3 * 0.7;
        assert!((scores.get(PlasticCategory::Hdpe).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_visual_bonuses() {
        let scores = score_categories(&[], &stats(true, false, false), &ScoringWeights::default());
        assert!((scores.get(PlasticCategory::Pet).unwrap() - 0.5 * 0.7).abs() < 1e-6);
        // PP is medium transparency, only the smooth bonus applies
        assert!((scores.get(PlasticCategory::Pp).unwrap() - 0.2 * 0.7).abs() < 1e-6);
        assert_eq!(scores.get(PlasticCategory::Pvc), Some(0.0));

        let scores = score_categories(&[], &stats(false, true, true), &ScoringWeights::default());
        assert!((scores.get(PlasticCategory::Pvc).unwrap() - 0.5 * 0.7).abs() < 1e-6);
        assert!((scores.get(PlasticCategory::Hdpe).unwrap() - 0.3 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_weights_are_data() {
        let weights = ScoringWeights {
            keyword_weight: 1.0,
            transparency_bonus: 0.0,
            texture_bonus: 0.0,
        };
        let labels = vec![RecognitionLabel::new("pipe", 0.5)];
        let scores = score_categories(&labels, &stats(false, true, true), &weights);
        assert!((scores.get(PlasticCategory::Pvc).unwrap() - 0.5 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_scores_cover_registry_in_order() {
        let scores = score_categories(&[], &stats(false, false, false), &ScoringWeights::default());
        let order: Vec<_> = scores.iter().map(|(c, _)| c).collect();
        assert_eq!(order, crate::classifier::signature::REGISTRY_ORDER.to_vec());
        assert!(scores.get(PlasticCategory::Unknown).is_none());
    }

    #[test]
    fn test_label_probability_is_clamped() {
        assert_eq!(RecognitionLabel::new("x", 1.7).probability, 1.0);
        assert_eq!(RecognitionLabel::new("x", -0.1).probability, 0.0);
        assert_eq!(RecognitionLabel::new("x", f32::NAN).probability, 0.0);
    }

    #[test]
    fn test_invalid_weights() {
        assert!(ScoringWeights::default().is_valid());
        let weights = ScoringWeights {
            keyword_weight: f32::INFINITY,
            ..ScoringWeights::default()
        };
        assert!(!weights.is_valid());
    }
}
