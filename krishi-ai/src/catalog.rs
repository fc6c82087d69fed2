//! Canonical disease catalog
//!
//! Fixed at compile time and read-only for the process lifetime. Order matters:
//! the offline predictor indexes into [`CATALOG`], so reordering entries changes
//! which disease a given image hash resolves to.

use serde::Serialize;

/// Identifier reported when no disease is detected (and for unknown labels)
pub const DEFAULT_DISEASE_ID: &str = "healthy_leaf";

/// Immutable catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanonicalDisease {
    /// Stable key shared with the knowledge base
    pub id: &'static str,
    /// Human-readable disease name
    pub name: &'static str,
    pub crop: &'static str,
    /// Expected confidence interval `[low, high]`
    pub confidence_range: (f64, f64),
}

macro_rules! disease {
    ($id:literal, $name:literal, $crop:literal, $low:literal, $high:literal) => {
        CanonicalDisease {
            id: $id,
            name: $name,
            crop: $crop,
            confidence_range: ($low, $high),
        }
    };
}

pub const CATALOG: [CanonicalDisease; 15] = [
    disease!("tomato_late_blight", "Late Blight", "Tomato", 0.85, 0.97),
    disease!("tomato_early_blight", "Early Blight", "Tomato", 0.82, 0.95),
    disease!("tomato_bacterial_spot", "Bacterial Spot", "Tomato", 0.78, 0.93),
    disease!("tomato_yellow_leaf_curl", "Yellow Leaf Curl Virus", "Tomato", 0.80, 0.96),
    disease!("potato_early_blight", "Early Blight", "Potato", 0.83, 0.94),
    disease!("potato_late_blight", "Late Blight", "Potato", 0.86, 0.97),
    disease!("apple_scab", "Apple Scab", "Apple", 0.84, 0.96),
    disease!("apple_black_rot", "Black Rot", "Apple", 0.80, 0.93),
    disease!("corn_common_rust", "Common Rust", "Corn (Maize)", 0.81, 0.94),
    disease!("corn_northern_leaf_blight", "Northern Leaf Blight", "Corn (Maize)", 0.79, 0.93),
    disease!("grape_black_rot", "Black Rot", "Grape", 0.83, 0.95),
    disease!("rice_brown_spot", "Brown Spot", "Rice", 0.80, 0.94),
    disease!("wheat_leaf_rust", "Leaf Rust", "Wheat", 0.82, 0.95),
    disease!("citrus_greening", "Citrus Greening (Huanglongbing)", "Citrus", 0.77, 0.92),
    disease!("healthy_leaf", "Healthy — No Disease Detected", "Various", 0.88, 0.99),
];

/// Look up a catalog entry by id
pub fn get(id: &str) -> Option<&'static CanonicalDisease> {
    CATALOG.iter().find(|d| d.id == id)
}

pub fn contains(id: &str) -> bool {
    get(id).is_some()
}

/// All catalog ids in catalog order
pub fn ids() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|d| d.id)
}
