use serde::Serialize;

use super::signature::PlasticCategory;

/// Recyclability verdict and disposal advice for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecyclingGuidance {
    /// Resin identification code printed inside the recycling symbol
    pub resin_code: Option<u8>,
    /// Whether curbside programs commonly accept this category
    pub recyclable: bool,
    pub suggestions: &'static [&'static str],
}

impl PlasticCategory {
    pub fn recycling_guidance(self) -> RecyclingGuidance {
        match self {
            Self::Pet => RecyclingGuidance {
                resin_code: Some(1),
                recyclable: true,
                suggestions: &[
                    "Empty and rinse the bottle before recycling",
                    "Keep the cap on unless your local program asks otherwise",
                    "Crush the bottle to save space in the bin",
                ],
            },
            Self::Hdpe => RecyclingGuidance {
                resin_code: Some(2),
                recyclable: true,
                suggestions: &[
                    "Rinse out detergent or milk residue",
                    "Remove pumps and sprayers, which are usually made of mixed materials",
                    "HDPE is accepted by most curbside programs",
                ],
            },
            Self::Pvc => RecyclingGuidance {
                resin_code: Some(3),
                recyclable: false,
                suggestions: &[
                    "Do not place PVC in curbside recycling",
                    "Take pipes and window frames to a construction waste facility",
                    "Consider reusing offcuts for small projects",
                ],
            },
            Self::Ldpe => RecyclingGuidance {
                resin_code: Some(4),
                recyclable: false,
                suggestions: &[
                    "Return clean, dry bags and film to store drop-off points",
                    "Keep film out of curbside bins, it jams sorting machinery",
                    "Switch to reusable bags where possible",
                ],
            },
            Self::Pp => RecyclingGuidance {
                resin_code: Some(5),
                recyclable: true,
                suggestions: &[
                    "Clean food residue from containers",
                    "Check that your local program accepts number 5 plastics",
                    "Reuse sturdy containers for storage",
                ],
            },
            Self::Ps => RecyclingGuidance {
                resin_code: Some(6),
                recyclable: false,
                suggestions: &[
                    "Foam polystyrene is rarely accepted curbside",
                    "Look for a dedicated foam drop-off location",
                    "Avoid single-use foam containers when you can",
                ],
            },
            Self::Other => RecyclingGuidance {
                resin_code: Some(7),
                recyclable: false,
                suggestions: &[
                    "Check the item for a resin code before disposal",
                    "Mixed plastics usually belong in general waste",
                    "Donate toys and durable items that are still usable",
                ],
            },
            Self::Unknown => RecyclingGuidance {
                resin_code: None,
                recyclable: false,
                suggestions: &[
                    "Look for a resin identification code on the item",
                    "Try another photo with the item centered and well lit",
                    "When in doubt, contact your local recycling facility",
                ],
            },
        }
    }
}
