//! Barrier -> suggested adjustments.
//!
//! Explicit per-barrier lists win outright. Otherwise the generic templates of
//! each linked diagnosis (in the barrier's order) are followed by the general
//! list, de-duplicated by title and capped.

use crate::catalog::{AdjustmentTemplate, Barrier, Catalog, GENERAL_TEMPLATES};
use serde::Serialize;
use std::collections::HashSet;

/// Default cap on generic-fallback suggestions. Overridable through the
/// `resolver.maxGenericSuggestions` setup field.
pub const DEFAULT_GENERIC_CAP: usize = 4;

const LIBRARY_ID_SEP: &str = "__";
const ROSTER_KEY_PREFIX: &str = "adj:";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAdjustment {
    /// Library id, `<barrierId>__<index>`.
    pub id: String,
    /// Roster key, `adj:<barrierId>:<index>`.
    pub key: String,
    pub index: usize,
    pub title: String,
    pub text: String,
    pub barrier_id: String,
    pub barrier_label: String,
}

impl ResolvedAdjustment {
    fn bind(barrier: &Barrier, index: usize, tpl: &AdjustmentTemplate) -> Self {
        Self {
            id: library_id(&barrier.id, index),
            key: roster_key(&barrier.id, index),
            index,
            title: tpl.title.clone(),
            text: tpl.text.clone(),
            barrier_id: barrier.id.clone(),
            barrier_label: barrier.display_label().to_string(),
        }
    }

    pub fn template(&self) -> AdjustmentTemplate {
        AdjustmentTemplate {
            title: self.title.clone(),
            text: self.text.clone(),
        }
    }
}

pub fn library_id(barrier_id: &str, index: usize) -> String {
    format!("{barrier_id}{LIBRARY_ID_SEP}{index}")
}

pub fn roster_key(barrier_id: &str, index: usize) -> String {
    format!("{ROSTER_KEY_PREFIX}{barrier_id}:{index}")
}

/// A reference to one resolved adjustment, as sent by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustmentRef {
    Library { barrier_id: String, index: usize },
    RosterKey { barrier_id: String, index: usize },
}

impl AdjustmentRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix(ROSTER_KEY_PREFIX) {
            let mut parts = rest.split(':');
            let (Some(barrier_id), Some(idx), None) = (parts.next(), parts.next(), parts.next())
            else {
                return None;
            };
            let index = idx.parse().ok()?;
            return Some(Self::RosterKey {
                barrier_id: barrier_id.to_string(),
                index,
            });
        }
        let (barrier_id, idx) = raw.rsplit_once(LIBRARY_ID_SEP)?;
        let index = idx.parse().ok()?;
        Some(Self::Library {
            barrier_id: barrier_id.to_string(),
            index,
        })
    }

    pub fn barrier_id(&self) -> &str {
        match self {
            Self::Library { barrier_id, .. } | Self::RosterKey { barrier_id, .. } => barrier_id,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Library { index, .. } | Self::RosterKey { index, .. } => *index,
        }
    }
}

/// Templates that apply to `barrier_id`. Unknown barriers yield an empty list.
pub fn resolve_templates<'c>(
    catalog: &'c Catalog,
    barrier_id: &str,
    cap: usize,
) -> Vec<&'c AdjustmentTemplate> {
    let explicit = catalog.explicit_adjustments(barrier_id);
    if !explicit.is_empty() {
        return explicit.iter().collect();
    }

    let Some(barrier) = catalog.barrier(barrier_id) else {
        return Vec::new();
    };

    let candidates = barrier
        .diagnosis_ids
        .iter()
        .flat_map(|did| catalog.generic_templates(did))
        .chain(catalog.generic_templates(GENERAL_TEMPLATES));

    dedupe_by_title(candidates, cap)
}

fn dedupe_by_title<'c>(
    candidates: impl Iterator<Item = &'c AdjustmentTemplate>,
    cap: usize,
) -> Vec<&'c AdjustmentTemplate> {
    let mut seen: HashSet<&str> = HashSet::new();
    candidates
        .filter(|t| !t.title.is_empty())
        .filter(|t| seen.insert(t.title.as_str()))
        .take(cap)
        .collect()
}

/// Resolved adjustments for one barrier, bound to that barrier.
pub fn resolve_adjustments(
    catalog: &Catalog,
    barrier_id: &str,
    cap: usize,
) -> Vec<ResolvedAdjustment> {
    // Explicit lists can exist for an id the barrier table lacks; nothing to bind them to.
    let Some(barrier) = catalog.barrier(barrier_id) else {
        return Vec::new();
    };
    resolve_templates(catalog, barrier_id, cap)
        .into_iter()
        .enumerate()
        .map(|(i, tpl)| ResolvedAdjustment::bind(barrier, i, tpl))
        .collect()
}

/// Every barrier's resolved adjustments, flattened in catalog order.
pub fn build_library(
    catalog: &Catalog,
    cap: usize,
    barrier_filter: Option<&str>,
) -> Vec<ResolvedAdjustment> {
    let barrier_filter = barrier_filter.map(str::trim).filter(|b| !b.is_empty());
    catalog
        .barriers
        .iter()
        .filter(|b| barrier_filter.map(|f| f == b.id).unwrap_or(true))
        .flat_map(|b| resolve_adjustments(catalog, &b.id, cap))
        .collect()
}

/// Barrier choices for a library filter: first occurrence order, no repeats.
pub fn barrier_options(adjustments: &[ResolvedAdjustment]) -> Vec<(String, String)> {
    let mut seen: HashSet<&str> = HashSet::new();
    adjustments
        .iter()
        .filter(|a| !a.barrier_id.is_empty() && seen.insert(a.barrier_id.as_str()))
        .map(|a| (a.barrier_id.clone(), a.barrier_label.clone()))
        .collect()
}

pub fn find_adjustment(
    catalog: &Catalog,
    cap: usize,
    adjustment: &AdjustmentRef,
) -> Option<ResolvedAdjustment> {
    resolve_adjustments(catalog, adjustment.barrier_id(), cap)
        .into_iter()
        .nth(adjustment.index())
}
