//! Taxonomy Mapper
//!
//! Maps provider-native labels to canonical disease ids. Lossy by intent: the
//! catalog models 15 diseases, the PlantVillage vocabulary 38 classes plus a
//! background class, so several unmodeled diseases resolve to their closest
//! cataloged analog. Those pairings are domain decisions and stay fixed.
//!
//! Lookup order:
//! 1. Exact match in [`PLANTVILLAGE_LABELS`]
//! 2. Label that already is a catalog id (providers prompted in canonical vocabulary)
//! 3. [`DEFAULT_DISEASE_ID`]
//!
//! Never fails and has no side effects.

use crate::catalog::{self, DEFAULT_DISEASE_ID};

/// PlantVillage class label → canonical id
pub const PLANTVILLAGE_LABELS: [(&str, &str); 39] = [
    ("Tomato___Late_blight", "tomato_late_blight"),
    ("Tomato___Early_blight", "tomato_early_blight"),
    ("Tomato___Bacterial_spot", "tomato_bacterial_spot"),
    ("Tomato___Tomato_Yellow_Leaf_Curl_Virus", "tomato_yellow_leaf_curl"),
    ("Tomato___healthy", "healthy_leaf"),
    ("Tomato___Leaf_Mold", "tomato_late_blight"),          // closest match
    ("Tomato___Septoria_leaf_spot", "tomato_early_blight"), // closest match
    ("Tomato___Spider_mites Two-spotted_spider_mite", "tomato_bacterial_spot"), // closest match
    ("Tomato___Target_Spot", "tomato_early_blight"),        // closest match
    ("Tomato___Tomato_mosaic_virus", "tomato_yellow_leaf_curl"), // closest match
    ("Potato___Early_blight", "potato_early_blight"),
    ("Potato___Late_blight", "potato_late_blight"),
    ("Potato___healthy", "healthy_leaf"),
    ("Apple___Apple_scab", "apple_scab"),
    ("Apple___Black_rot", "apple_black_rot"),
    ("Apple___Cedar_apple_rust", "apple_scab"), // closest match
    ("Apple___healthy", "healthy_leaf"),
    ("Corn_(maize)___Common_rust_", "corn_common_rust"),
    ("Corn_(maize)___Northern_Leaf_Blight", "corn_northern_leaf_blight"),
    ("Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot", "corn_northern_leaf_blight"), // closest
    ("Corn_(maize)___healthy", "healthy_leaf"),
    ("Grape___Black_rot", "grape_black_rot"),
    ("Grape___Esca_(Black_Measles)", "grape_black_rot"),              // closest match
    ("Grape___Leaf_blight_(Isariopsis_Leaf_Spot)", "grape_black_rot"), // closest match
    ("Grape___healthy", "healthy_leaf"),
    ("Cherry_(including_sour)___Powdery_mildew", "apple_scab"), // closest match
    ("Cherry_(including_sour)___healthy", "healthy_leaf"),
    ("Strawberry___Leaf_scorch", "tomato_early_blight"), // closest match
    ("Strawberry___healthy", "healthy_leaf"),
    ("Peach___Bacterial_spot", "tomato_bacterial_spot"), // closest match
    ("Peach___healthy", "healthy_leaf"),
    ("Pepper,_bell___Bacterial_spot", "tomato_bacterial_spot"), // closest match
    ("Pepper,_bell___healthy", "healthy_leaf"),
    ("Soybean___healthy", "healthy_leaf"),
    ("Squash___Powdery_mildew", "apple_scab"), // closest match
    ("Raspberry___healthy", "healthy_leaf"),
    ("Orange___Haunglongbing_(Citrus_greening)", "citrus_greening"),
    ("Blueberry___healthy", "healthy_leaf"),
    ("Background_without_leaves", "healthy_leaf"),
];

/// Map a raw provider label to a canonical disease id
pub fn map_label(raw_label: &str) -> &'static str {
    if let Some((_, id)) = PLANTVILLAGE_LABELS
        .iter()
        .find(|(label, _)| *label == raw_label)
    {
        return *id;
    }

    if let Some(disease) = catalog::get(raw_label) {
        return disease.id;
    }

    DEFAULT_DISEASE_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_target_is_cataloged() {
        for (label, id) in PLANTVILLAGE_LABELS.iter() {
            let mapped = map_label(label);
            assert_eq!(mapped, *id);
            assert!(catalog::contains(mapped), "{} → {} not in catalog", label, id);
        }
    }

    #[test]
    fn test_exact_matches() {
        assert_eq!(map_label("Tomato___Late_blight"), "tomato_late_blight");
        assert_eq!(map_label("Orange___Haunglongbing_(Citrus_greening)"), "citrus_greening");
    }

    #[test]
    fn test_closest_match_collapsing() {
        assert_eq!(map_label("Tomato___Leaf_Mold"), "tomato_late_blight");
        assert_eq!(map_label("Squash___Powdery_mildew"), "apple_scab");
        assert_eq!(map_label("Cherry_(including_sour)___Powdery_mildew"), "apple_scab");
        assert_eq!(map_label("Strawberry___Leaf_scorch"), "tomato_early_blight");
    }

    #[test]
    fn test_unknown_labels_default() {
        for label in ["", "tomato late blight", "Tomato___late_blight", "Banana___Wilt", "💥"] {
            assert_eq!(map_label(label), DEFAULT_DISEASE_ID, "label {:?}", label);
        }
    }

    #[test]
    fn test_canonical_ids_pass_through() {
        for id in catalog::ids() {
            assert_eq!(map_label(id), id);
        }
    }
}
