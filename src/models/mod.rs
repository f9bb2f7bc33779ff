pub mod breed;

use serde::{Deserialize, Serialize};

pub use breed::breed_label;

/// Single detector output, in pixel coordinates of the image that was passed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub x: f32, // box centre
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Body of a successful `/predict` response.
/// Box extents carry the `_cm` suffix although they are pixel sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub breed: String,
    pub confidence: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub message: String,
}

impl DetectionResult {
    pub fn from_detection(detection: &Detection, message: &str) -> Self {
        Self {
            breed: breed_label(detection.class_id).to_string(),
            confidence: round2(detection.confidence),
            width_cm: round2(detection.width),
            height_cm: round2(detection.height),
            message: message.to_string(),
        }
    }
}

fn round2(value: f32) -> f64 {
    (value as f64 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NutritionItem {
    pub name: String,
    pub amount: String,
    pub description: String,
}

impl NutritionItem {
    fn new(name: &str, amount: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            amount: amount.to_string(),
            description: description.to_string(),
        }
    }
}

/// Four-category feeding plan. Every category is always populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NutritionPlan {
    pub forage: NutritionItem,
    pub grain: NutritionItem,
    pub liquid: NutritionItem,
    pub supplement: NutritionItem,
}

impl Default for NutritionPlan {
    fn default() -> Self {
        Self {
            forage: NutritionItem::new(
                "Alfalfa Hay",
                "12-15 kg/day",
                "High-quality forage for digestive health",
            ),
            grain: NutritionItem::new(
                "Mixed Grain Feed",
                "8-10 kg/day",
                "Balanced grain mix for energy",
            ),
            liquid: NutritionItem::new(
                "Fresh Water",
                "80-110 liters/day",
                "Clean water essential for health",
            ),
            supplement: NutritionItem::new(
                "Mineral Mix",
                "150-200 g/day",
                "Essential minerals and vitamins",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionCategory {
    Forage,
    Grain,
    Liquid,
    Supplement,
}

impl NutritionCategory {
    pub const ALL: [NutritionCategory; 4] = [
        NutritionCategory::Forage,
        NutritionCategory::Grain,
        NutritionCategory::Liquid,
        NutritionCategory::Supplement,
    ];

    /// Section heading as it appears in the generated text.
    pub fn heading(&self) -> &'static str {
        match self {
            NutritionCategory::Forage => "Forage",
            NutritionCategory::Grain => "Grain",
            NutritionCategory::Liquid => "Liquid",
            NutritionCategory::Supplement => "Supplement",
        }
    }
}

impl NutritionPlan {
    pub fn item_mut(&mut self, category: NutritionCategory) -> &mut NutritionItem {
        match category {
            NutritionCategory::Forage => &mut self.forage,
            NutritionCategory::Grain => &mut self.grain,
            NutritionCategory::Liquid => &mut self.liquid,
            NutritionCategory::Supplement => &mut self.supplement,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreedSuggestion {
    pub breed: String,
    #[serde(alias = "reason")]
    pub benefit: String,
}

/// What came back from one text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum AiReply {
    Error(String),
    Text(String),
    Suggestions(serde_json::Value),
}

impl AiReply {
    pub fn text(&self) -> Option<&str> {
        match self {
            AiReply::Text(text) => Some(text),
            _ => None,
        }
    }
}
