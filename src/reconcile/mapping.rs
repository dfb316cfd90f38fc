//! Operator-directed category mapping.
//!
//! [`CategoryMapping::propose`] matches every incoming category to a target
//! category by exact name and gives unmatched names fresh ids. The operator
//! may then override entries with [`CategoryMapping::assign`] or drop a
//! category's annotations with [`CategoryMapping::skip`]. Nothing is applied
//! until [`CategoryMapping::validate`] accepts the whole batch.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::dataset::{CategoryId, Dataset};
use crate::error::PolicyConflict;

/// How one incoming category resolves in the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    /// Id of the category in the incoming dataset.
    pub source_id: CategoryId,
    /// Name of the category in the incoming dataset.
    pub name: String,
    /// Id the category gets in the target; `None` drops its annotations.
    pub target_id: Option<CategoryId>,
    /// True when the proposal found a same-named target category.
    pub matched_by_name: bool,
}

/// A batch of category id assignments for one merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryMapping {
    entries: Vec<MappingEntry>,
}

impl CategoryMapping {
    /// Proposes an assignment for every category of `source`.
    ///
    /// A source category whose name equals a target category's name maps to
    /// that category's id (the first one, if names repeat). Every other name
    /// gets `running maximum + 1`, where the running maximum starts at the
    /// largest target category id.
    pub fn propose(target: &Dataset, source: &Dataset) -> Self {
        let mut by_name: HashMap<&str, CategoryId> = HashMap::new();
        for cat in &target.categories {
            by_name.entry(cat.name.as_str()).or_insert(cat.id);
        }

        let mut running_max = target
            .categories
            .iter()
            .map(|c| c.id.as_u64())
            .max()
            .unwrap_or(0);

        let entries = source
            .categories
            .iter()
            .map(|cat| {
                let (target_id, matched_by_name) = match by_name.get(cat.name.as_str()) {
                    Some(&id) => (Some(id), true),
                    None => match running_max.checked_add(1) {
                        Some(next) => {
                            running_max = next;
                            (Some(CategoryId(next)), false)
                        }
                        None => (None, false),
                    },
                };
                MappingEntry {
                    source_id: cat.id,
                    name: cat.name.clone(),
                    target_id,
                    matched_by_name,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// The target id a source category resolves to, if any.
    pub fn resolve(&self, source_id: CategoryId) -> Option<CategoryId> {
        self.entry(source_id).and_then(|e| e.target_id)
    }

    /// Overrides the proposed id of one source category.
    pub fn assign(&mut self, source_id: CategoryId, target_id: CategoryId) -> Result<(), PolicyConflict> {
        let entry = self.entry_mut(source_id)?;
        entry.target_id = Some(target_id);
        Ok(())
    }

    /// Leaves a source category unmapped; its annotations are not imported.
    pub fn skip(&mut self, source_id: CategoryId) -> Result<(), PolicyConflict> {
        let entry = self.entry_mut(source_id)?;
        entry.target_id = None;
        Ok(())
    }

    /// Checks the batch against both datasets.
    ///
    /// Rejects, in order: entries for categories the source does not have;
    /// one id proposed for two source categories; an id already used by a
    /// target category, unless that target category has the same name as
    /// the source category (a merge into its namesake).
    pub fn validate(&self, target: &Dataset, source: &Dataset) -> Result<(), PolicyConflict> {
        let source_names: HashMap<CategoryId, &str> = source
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();
        let target_names: HashMap<CategoryId, &str> = target
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();

        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| !source_names.contains_key(&e.source_id))
        {
            return Err(PolicyConflict::UnknownSourceCategory {
                source_id: entry.source_id,
            });
        }

        let mut claimed: BTreeMap<CategoryId, CategoryId> = BTreeMap::new();
        for entry in &self.entries {
            let Some(id) = entry.target_id else {
                continue;
            };
            if let Some(&first) = claimed.get(&id) {
                return Err(PolicyConflict::DuplicateTargetId {
                    id,
                    first,
                    second: entry.source_id,
                });
            }
            claimed.insert(id, entry.source_id);
        }

        for entry in &self.entries {
            let Some(id) = entry.target_id else {
                continue;
            };
            if let Some(existing_name) = target_names.get(&id) {
                if source_names.get(&entry.source_id) != Some(existing_name) {
                    return Err(PolicyConflict::CollidesWithExisting {
                        source_id: entry.source_id,
                        id,
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolved ids that do not exist in `target`; these become new
    /// categories when the mapping is applied.
    pub(crate) fn fresh_ids(&self, target: &Dataset) -> HashSet<CategoryId> {
        let existing: HashSet<CategoryId> = target.categories.iter().map(|c| c.id).collect();
        self.entries
            .iter()
            .filter_map(|e| e.target_id)
            .filter(|id| !existing.contains(id))
            .collect()
    }

    fn entry(&self, source_id: CategoryId) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.source_id == source_id)
    }

    fn entry_mut(&mut self, source_id: CategoryId) -> Result<&mut MappingEntry, PolicyConflict> {
        self.entries
            .iter_mut()
            .find(|e| e.source_id == source_id)
            .ok_or(PolicyConflict::UnknownSourceCategory { source_id })
    }
}
