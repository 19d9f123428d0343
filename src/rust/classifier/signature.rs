use std::fmt;

use serde::{Deserialize, Serialize};

/// The plastic categories the engine can report.
///
/// `Unknown` is the outcome when no category clears the confidence floor; it
/// has no signature in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlasticCategory {
    Pet,
    Hdpe,
    Pvc,
    Ldpe,
    Pp,
    Ps,
    Other,
    Unknown,
}

/// Registry order. Earlier entries win ties in the decision stage.
pub const REGISTRY_ORDER: [PlasticCategory; 7] = [
    PlasticCategory::Pet,
    PlasticCategory::Hdpe,
    PlasticCategory::Pvc,
    PlasticCategory::Ldpe,
    PlasticCategory::Pp,
    PlasticCategory::Ps,
    PlasticCategory::Other,
];

impl PlasticCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pet => "PET",
            Self::Hdpe => "HDPE",
            Self::Pvc => "PVC",
            Self::Ldpe => "LDPE",
            Self::Pp => "PP",
            Self::Ps => "PS",
            Self::Other => "OTHER",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Full polymer name, as shown to end users
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pet => "Polyethylene Terephthalate (PET)",
            Self::Hdpe => "High-Density Polyethylene (HDPE)",
            Self::Pvc => "Polyvinyl Chloride (PVC)",
            Self::Ldpe => "Low-Density Polyethylene (LDPE)",
            Self::Pp => "Polypropylene (PP)",
            Self::Ps => "Polystyrene (PS)",
            Self::Other => "Other Plastics",
            Self::Unknown => "Unknown",
        }
    }

    /// Looks up the category signature. `None` only for `Unknown`.
    pub fn signature(self) -> Option<&'static CategorySignature> {
        match self {
            Self::Pet => Some(&PET),
            Self::Hdpe => Some(&HDPE),
            Self::Pvc => Some(&PVC),
            Self::Ldpe => Some(&LDPE),
            Self::Pp => Some(&PP),
            Self::Ps => Some(&PS),
            Self::Other => Some(&OTHER),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for PlasticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Texture {
    Smooth,
    Matte,
    Rigid,
    Flexible,
}

/// Qualitative description of how items of a category usually look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualProfile {
    pub transparency: Transparency,
    pub texture: Texture,
    pub shapes: &'static [&'static str],
    pub uses: &'static [&'static str],
}

/// Static description of one plastic category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategorySignature {
    pub category: PlasticCategory,
    /// Lowercase keywords matched as substrings of recognition labels
    pub keywords: &'static [&'static str],
    pub visual_profile: VisualProfile,
    /// Prior confidence in `(0, 1]`
    pub base_weight: f32,
}

static PET: CategorySignature = CategorySignature {
    category: PlasticCategory::Pet,
    keywords: &["bottle", "water bottle", "plastic bottle", "beverage", "container", "transparent", "clear"],
    visual_profile: VisualProfile {
        transparency: Transparency::High,
        texture: Texture::Smooth,
        shapes: &["cylindrical", "bottle"],
        uses: &["beverages", "food containers"],
    },
    base_weight: 0.7,
};

static HDPE: CategorySignature = CategorySignature {
    category: PlasticCategory::Hdpe,
    keywords: &["milk jug", "detergent", "bottle", "container", "jug", "opaque", "white"],
    visual_profile: VisualProfile {
        transparency: Transparency::Low,
        texture: Texture::Matte,
        shapes: &["jug", "bottle", "container"],
        uses: &["milk", "detergent", "shampoo"],
    },
    base_weight: 0.7,
};

static PVC: CategorySignature = CategorySignature {
    category: PlasticCategory::Pvc,
    keywords: &["pipe", "tubing", "window", "frame", "rigid", "construction"],
    visual_profile: VisualProfile {
        transparency: Transparency::Low,
        texture: Texture::Rigid,
        shapes: &["pipe", "frame", "sheet"],
        uses: &["construction", "plumbing"],
    },
    base_weight: 0.7,
};

static LDPE: CategorySignature = CategorySignature {
    category: PlasticCategory::Ldpe,
    keywords: &["bag", "film", "wrap", "flexible", "soft", "squeeze"],
    visual_profile: VisualProfile {
        transparency: Transparency::Medium,
        texture: Texture::Flexible,
        shapes: &["film", "bag", "flexible container"],
        uses: &["bags", "wraps", "squeeze bottles"],
    },
    base_weight: 0.7,
};

static PP: CategorySignature = CategorySignature {
    category: PlasticCategory::Pp,
    keywords: &["container", "tupperware", "cap", "lid", "food container"],
    visual_profile: VisualProfile {
        transparency: Transparency::Medium,
        texture: Texture::Smooth,
        shapes: &["container", "cap", "tub"],
        uses: &["food storage", "bottle caps"],
    },
    base_weight: 0.7,
};

static PS: CategorySignature = CategorySignature {
    category: PlasticCategory::Ps,
    keywords: &["styrofoam", "foam", "cup", "disposable", "takeout", "clamshell", "tray"],
    visual_profile: VisualProfile {
        transparency: Transparency::Medium,
        texture: Texture::Rigid,
        shapes: &["cup", "clamshell", "tray"],
        uses: &["takeout food", "disposable cutlery", "packaging foam"],
    },
    base_weight: 0.6,
};

static OTHER: CategorySignature = CategorySignature {
    category: PlasticCategory::Other,
    keywords: &["plastic", "toy", "packaging", "polycarbonate", "acrylic", "nylon"],
    visual_profile: VisualProfile {
        transparency: Transparency::Medium,
        texture: Texture::Matte,
        shapes: &["mixed"],
        uses: &["toys", "electronics housings", "mixed-material packaging"],
    },
    base_weight: 0.5,
};

/// Iterates every registered signature in registry order.
pub fn signatures() -> impl Iterator<Item = &'static CategorySignature> {
    REGISTRY_ORDER.iter().filter_map(|category| category.signature())
}
