//! Disease knowledge base
//!
//! Human-facing text for each canonical id: description, treatment steps and
//! prevention advice. The bundled implementation is compiled in from
//! `data/disease_kb.json`.

use crate::catalog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const BUNDLED_KB: &str = include_str!("../data/disease_kb.json");

/// One treatment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub text: String,
    /// Organic / low-impact option
    pub eco_friendly: bool,
}

/// Knowledge-base entry for one canonical disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    #[serde(rename = "disease")]
    pub display_name: String,
    pub crop: String,
    pub description: String,
    pub treatment: Vec<Treatment>,
    pub prevention: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KbEntry {
    id: String,
    #[serde(flatten)]
    info: DiseaseInfo,
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge base is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Duplicate knowledge base entry for '{0}'")]
    Duplicate(String),

    #[error("Knowledge base has no entry for catalog ids: {}", .0.join(", "))]
    MissingEntries(Vec<String>),
}

/// Lookup of display text by canonical id
pub trait KnowledgeBase: Send + Sync {
    fn lookup(&self, disease_id: &str) -> Option<DiseaseInfo>;
}

/// In-memory knowledge base
#[derive(Debug, Clone)]
pub struct StaticKnowledgeBase {
    entries: HashMap<String, DiseaseInfo>,
}

impl StaticKnowledgeBase {
    /// Knowledge base embedded in the binary
    pub fn bundled() -> Result<Self, KnowledgeError> {
        Self::from_json(BUNDLED_KB)
    }

    /// Parse a JSON array of `{id, disease, crop, description, treatment, prevention}`
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let raw: Vec<KbEntry> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for entry in raw {
            if entries.insert(entry.id.clone(), entry.info).is_some() {
                return Err(KnowledgeError::Duplicate(entry.id));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn lookup(&self, disease_id: &str) -> Option<DiseaseInfo> {
        self.entries.get(disease_id).cloned()
    }
}

/// Fail unless every catalog id has an entry
pub fn verify_catalog_coverage(kb: &dyn KnowledgeBase) -> Result<(), KnowledgeError> {
    let missing: Vec<String> = catalog::ids()
        .filter(|id| kb.lookup(id).is_none())
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(KnowledgeError::MissingEntries(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_covers_catalog() {
        let kb = StaticKnowledgeBase::bundled().unwrap();
        assert_eq!(kb.len(), catalog::CATALOG.len());
        verify_catalog_coverage(&kb).unwrap();
    }

    #[test]
    fn test_bundled_names_agree_with_catalog() {
        let kb = StaticKnowledgeBase::bundled().unwrap();
        for disease in catalog::CATALOG.iter() {
            let info = kb.lookup(disease.id).unwrap();
            assert_eq!(info.display_name, disease.name, "{}", disease.id);
            assert_eq!(info.crop, disease.crop, "{}", disease.id);
            assert!(!info.treatment.is_empty());
        }
    }

    #[test]
    fn test_missing_entries_reported() {
        let kb = StaticKnowledgeBase::from_json(
            r#"[{"id":"apple_scab","disease":"Apple Scab","crop":"Apple",
                 "description":"d","treatment":[],"prevention":[]}]"#,
        )
        .unwrap();
        match verify_catalog_coverage(&kb) {
            Err(KnowledgeError::MissingEntries(ids)) => {
                assert_eq!(ids.len(), catalog::CATALOG.len() - 1);
                assert!(!ids.contains(&"apple_scab".to_string()));
            }
            other => panic!("expected MissingEntries, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let entry = r#"{"id":"x","disease":"X","crop":"C","description":"d","treatment":[],"prevention":[]}"#;
        let json = format!("[{},{}]", entry, entry);
        assert!(matches!(
            StaticKnowledgeBase::from_json(&json),
            Err(KnowledgeError::Duplicate(_))
        ));
    }
}
