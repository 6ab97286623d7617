//! Static reference data: diagnoses, barriers, adjustment templates and the
//! descriptor tables used by the comment renderer.
//!
//! The catalog is loaded once at startup (builtin JSON or an override file)
//! and is read-only afterwards.

use crate::error::{AssistError, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Key of the generic template list appended to every barrier's fallback.
pub const GENERAL_TEMPLATES: &str = "general";
/// Catch-all diagnosis id; never used to filter barriers.
pub const ALL_DIAGNOSES: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnosis {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Barrier {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub diagnosis_ids: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Barrier {
    /// Label used in selection lists; falls back to the id when blank.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjustmentTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// Ordered key -> sentence table (engagement levels, outcome kinds).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorTable(Vec<(String, String)>);

impl DescriptorTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DescriptorTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = DescriptorTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of string descriptors")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, String)> = Vec::new();
                while let Some((k, v)) = map.next_entry::<String, String>()? {
                    // Later duplicates win, keeping the first position.
                    if let Some(slot) = entries.iter_mut().find(|(ek, _)| *ek == k) {
                        slot.1 = v;
                    } else {
                        entries.push((k, v));
                    }
                }
                Ok(DescriptorTable(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Problems found by [`Catalog::validate`]. None of them stop the catalog from
/// loading; they are logged and reported through `catalog.info`.
#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CatalogIssue {
    #[error("duplicate diagnosis id {id}")]
    DuplicateDiagnosis { id: String },

    #[error("duplicate barrier id {id}")]
    DuplicateBarrier { id: String },

    #[error("barrier {barrier_id} has no diagnosis ids")]
    #[serde(rename_all = "camelCase")]
    EmptyDiagnosisIds { barrier_id: String },

    #[error("barrier {barrier_id} references unknown diagnosis {diagnosis_id}")]
    #[serde(rename_all = "camelCase")]
    UnknownDiagnosis {
        barrier_id: String,
        diagnosis_id: String,
    },

    #[error("explicit adjustments listed for unknown barrier {barrier_id}")]
    #[serde(rename_all = "camelCase")]
    OrphanAdjustments { barrier_id: String },

    #[error("generic templates keyed by unknown diagnosis {key}")]
    UnknownTemplateKey { key: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub diagnoses: Vec<Diagnosis>,
    pub barriers: Vec<Barrier>,
    #[serde(default)]
    barrier_adjustments: HashMap<String, Vec<AdjustmentTemplate>>,
    #[serde(default)]
    adjustment_templates: HashMap<String, Vec<AdjustmentTemplate>>,
    #[serde(default)]
    pub engagement_descriptors: DescriptorTable,
    #[serde(default)]
    pub outcome_descriptors: DescriptorTable,
    #[serde(skip)]
    barrier_index: HashMap<String, usize>,
    #[serde(skip)]
    fingerprint: String,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AssistError::CatalogLoad(format!("{}: {}", path.to_string_lossy(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut catalog: Catalog =
            serde_json::from_str(text).map_err(|e| AssistError::CatalogLoad(e.to_string()))?;

        // First occurrence wins for lookups, matching list order in the UI.
        for (idx, b) in catalog.barriers.iter().enumerate() {
            catalog.barrier_index.entry(b.id.clone()).or_insert(idx);
        }

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        catalog.fingerprint = format!("{:x}", hasher.finalize());
        Ok(catalog)
    }

    /// Hex sha256 of the catalog source text.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn barrier(&self, id: &str) -> Option<&Barrier> {
        self.barrier_index.get(id).map(|&idx| &self.barriers[idx])
    }

    pub fn diagnosis(&self, id: &str) -> Option<&Diagnosis> {
        self.diagnoses.iter().find(|d| d.id == id)
    }

    /// Curated list for a barrier; empty when the barrier has none.
    pub fn explicit_adjustments(&self, barrier_id: &str) -> &[AdjustmentTemplate] {
        self.barrier_adjustments
            .get(barrier_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Generic list keyed by diagnosis id (or [`GENERAL_TEMPLATES`]).
    pub fn generic_templates(&self, key: &str) -> &[AdjustmentTemplate] {
        self.adjustment_templates
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Barriers linked to `diagnosis_id` (all barriers when it is empty or
    /// `all`) whose label or description contains `query`, case-insensitively.
    pub fn filter_barriers(
        &self,
        diagnosis_id: Option<&str>,
        query: Option<&str>,
    ) -> Vec<&Barrier> {
        let diagnosis_id = diagnosis_id
            .map(str::trim)
            .filter(|d| !d.is_empty() && *d != ALL_DIAGNOSES);
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.barriers
            .iter()
            .filter(|b| match diagnosis_id {
                Some(d) => b.diagnosis_ids.iter().any(|id| id == d),
                None => true,
            })
            .filter(|b| match needle.as_deref() {
                Some(q) => {
                    b.label.to_lowercase().contains(q) || b.description.to_lowercase().contains(q)
                }
                None => true,
            })
            .collect()
    }

    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        let mut diagnosis_ids: HashSet<&str> = HashSet::new();
        for d in &self.diagnoses {
            if !diagnosis_ids.insert(d.id.as_str()) {
                issues.push(CatalogIssue::DuplicateDiagnosis { id: d.id.clone() });
            }
        }

        let mut barrier_ids: HashSet<&str> = HashSet::new();
        for b in &self.barriers {
            if !barrier_ids.insert(b.id.as_str()) {
                issues.push(CatalogIssue::DuplicateBarrier { id: b.id.clone() });
            }
            if b.diagnosis_ids.is_empty() {
                issues.push(CatalogIssue::EmptyDiagnosisIds {
                    barrier_id: b.id.clone(),
                });
            }
            for did in &b.diagnosis_ids {
                if !diagnosis_ids.contains(did.as_str()) {
                    issues.push(CatalogIssue::UnknownDiagnosis {
                        barrier_id: b.id.clone(),
                        diagnosis_id: did.clone(),
                    });
                }
            }
        }

        let mut orphan_keys: Vec<&String> = self
            .barrier_adjustments
            .keys()
            .filter(|k| !barrier_ids.contains(k.as_str()))
            .collect();
        orphan_keys.sort();
        for k in orphan_keys {
            issues.push(CatalogIssue::OrphanAdjustments {
                barrier_id: k.clone(),
            });
        }

        let mut unknown_keys: Vec<&String> = self
            .adjustment_templates
            .keys()
            .filter(|k| k.as_str() != GENERAL_TEMPLATES && !diagnosis_ids.contains(k.as_str()))
            .collect();
        unknown_keys.sort();
        for k in unknown_keys {
            issues.push(CatalogIssue::UnknownTemplateKey { key: k.clone() });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_and_validates_cleanly() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        assert!(catalog.diagnosis(ALL_DIAGNOSES).is_some());
        assert!(catalog.barrier("reading-fluency").is_some());
        assert_eq!(catalog.fingerprint().len(), 64);
        assert_eq!(catalog.validate(), Vec::<CatalogIssue>::new());
    }

    #[test]
    fn descriptor_tables_keep_source_order() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let levels: Vec<&str> = catalog.engagement_descriptors.keys().collect();
        assert_eq!(levels, vec!["high", "moderate", "developing", "low"]);
        assert!(catalog
            .outcome_descriptors
            .get("improved-skills")
            .is_some_and(|s| s.contains("{studentName}")));
    }

    #[test]
    fn validate_reports_broken_references() {
        let catalog = Catalog::from_json_str(
            r#"{
                "diagnoses": [{"id": "adhd", "label": "ADHD"}, {"id": "adhd", "label": "again"}],
                "barriers": [
                    {"id": "b1", "label": "one", "diagnosisIds": []},
                    {"id": "b2", "label": "two", "diagnosisIds": ["nope"]},
                    {"id": "b2", "label": "dup", "diagnosisIds": ["adhd"]}
                ],
                "barrierAdjustments": {"ghost": [{"title": "t", "text": "x"}]},
                "adjustmentTemplates": {"general": [], "martian": []}
            }"#,
        )
        .expect("parse");

        let issues = catalog.validate();
        assert!(issues.contains(&CatalogIssue::DuplicateDiagnosis { id: "adhd".into() }));
        assert!(issues.contains(&CatalogIssue::DuplicateBarrier { id: "b2".into() }));
        assert!(issues.contains(&CatalogIssue::EmptyDiagnosisIds {
            barrier_id: "b1".into()
        }));
        assert!(issues.contains(&CatalogIssue::UnknownDiagnosis {
            barrier_id: "b2".into(),
            diagnosis_id: "nope".into()
        }));
        assert!(issues.contains(&CatalogIssue::OrphanAdjustments {
            barrier_id: "ghost".into()
        }));
        assert!(issues.contains(&CatalogIssue::UnknownTemplateKey { key: "martian".into() }));

        // Lookups resolve to the first barrier carrying an id.
        assert_eq!(catalog.barrier("b2").map(|b| b.label.as_str()), Some("two"));
    }

    #[test]
    fn filter_barriers_by_diagnosis_and_query() {
        let catalog = Catalog::builtin().expect("builtin catalog");

        let everything = catalog.filter_barriers(Some(ALL_DIAGNOSES), None);
        assert_eq!(everything.len(), catalog.barriers.len());

        let vision = catalog.filter_barriers(Some("vision"), None);
        assert!(!vision.is_empty());
        assert!(vision
            .iter()
            .all(|b| b.diagnosis_ids.iter().any(|d| d == "vision")));

        let fluency = catalog.filter_barriers(None, Some("  FLUENCY "));
        assert!(fluency.iter().any(|b| b.id == "reading-fluency"));
        assert!(fluency.iter().all(|b| {
            b.label.to_lowercase().contains("fluency")
                || b.description.to_lowercase().contains("fluency")
        }));
    }

    #[test]
    fn malformed_catalog_is_a_load_error() {
        let e = Catalog::from_json_str("{\"diagnoses\": 3}").expect_err("should fail");
        assert_eq!(e.code(), "catalog_invalid");
    }
}
