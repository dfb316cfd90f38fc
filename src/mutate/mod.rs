//! In-place edits that keep a dataset's cross-references consistent.
//!
//! - [`rename_categories`]: renumber categories, validated as a batch.
//! - [`delete_categories`]: remove categories and every annotation using
//!   them.
//! - [`delete_image`]: remove an image, its annotations and its path entry.
//! - [`repair`]: fill in missing `iscrowd` / `segmentation` fields.
//!
//! Rename validates the whole batch before touching anything. Deletes cannot
//! fail halfway: once the id checks pass, the removal runs to completion and
//! there is no undo.

mod repair;

pub use repair::{repair_fields, repair_iscrowd, repair_segmentation, RepairReport};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::dataset::{CategoryId, Dataset, ImageId, ImagePaths, Index};
use crate::error::{DoctorError, PolicyConflict, RecordKind};
use crate::palette::CategoryColors;

/// Counts from a category rename.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub categories_renamed: usize,
    pub annotations_updated: usize,
}

/// Renumbers categories.
///
/// `renames` maps current ids to new ids. The batch is checked as a whole:
/// every current id must exist, no two entries may claim the same new id,
/// and a new id may only coincide with an existing id if that id is itself
/// being renamed in the batch (so `{1 -> 2, 2 -> 1}` is a legal swap).
/// Category records and annotation `category_id`s are then rewritten in one
/// pass, and `colors`, if given, is re-keyed the same way.
///
/// # Errors
/// - [`DoctorError::Integrity`] on duplicate ids in the dataset.
/// - [`DoctorError::NotFound`] for a current id that does not exist.
/// - [`DoctorError::PolicyConflict`] for duplicate or colliding new ids.
///
/// On error nothing has been modified.
pub fn rename_categories(
    dataset: &mut Dataset,
    renames: &BTreeMap<CategoryId, CategoryId>,
    colors: Option<&mut CategoryColors>,
) -> Result<RenameReport, DoctorError> {
    let renames: BTreeMap<CategoryId, CategoryId> = renames
        .iter()
        .filter(|(old, new)| old != new)
        .map(|(old, new)| (*old, *new))
        .collect();

    validate_renames(dataset, &renames)?;

    let mut report = RenameReport::default();
    for cat in &mut dataset.categories {
        if let Some(&new) = renames.get(&cat.id) {
            cat.id = new;
            report.categories_renamed += 1;
        }
    }
    for ann in &mut dataset.annotations {
        if let Some(&new) = renames.get(&ann.category_id) {
            ann.category_id = new;
            report.annotations_updated += 1;
        }
    }
    if let Some(colors) = colors {
        colors.rekey(&renames);
    }

    Ok(report)
}

fn validate_renames(
    dataset: &Dataset,
    renames: &BTreeMap<CategoryId, CategoryId>,
) -> Result<(), DoctorError> {
    let index = Index::build(dataset)?;
    let existing = index.category_ids();

    if let Some(old) = renames.keys().find(|id| !existing.contains(*id)) {
        return Err(DoctorError::not_found(RecordKind::Category, old.as_u64()));
    }

    let mut claimed: BTreeMap<CategoryId, CategoryId> = BTreeMap::new();
    for (&old, &new) in renames {
        if let Some(&first) = claimed.get(&new) {
            return Err(PolicyConflict::DuplicateTargetId {
                id: new,
                first,
                second: old,
            }
            .into());
        }
        claimed.insert(new, old);
    }

    let vacated: BTreeSet<CategoryId> = renames.keys().copied().collect();
    let staying: BTreeSet<CategoryId> = existing.difference(&vacated).copied().collect();
    if let Some((&old, &new)) = renames.iter().find(|(_, new)| staying.contains(*new)) {
        return Err(PolicyConflict::CollidesWithExisting { source_id: old, id: new }.into());
    }

    Ok(())
}

/// Counts from a category delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteCategoriesReport {
    pub categories_removed: usize,
    pub annotations_removed: usize,
}

/// Removes categories and every annotation that references them.
///
/// Ids that are not in the dataset are ignored. The caller is responsible
/// for having confirmed the deletion; this function does not ask.
pub fn delete_categories(
    dataset: &mut Dataset,
    ids: &BTreeSet<CategoryId>,
    colors: Option<&mut CategoryColors>,
) -> DeleteCategoriesReport {
    let categories_before = dataset.categories.len();
    dataset.categories.retain(|cat| !ids.contains(&cat.id));

    let annotations_before = dataset.annotations.len();
    dataset
        .annotations
        .retain(|ann| !ids.contains(&ann.category_id));

    if let Some(colors) = colors {
        colors.remove_all(ids);
    }

    DeleteCategoriesReport {
        categories_removed: categories_before - dataset.categories.len(),
        annotations_removed: annotations_before - dataset.annotations.len(),
    }
}

/// Counts from an image delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteImageReport {
    pub annotations_removed: usize,
}

/// Removes one image, every annotation on it, and its path entry.
///
/// A caller keeping a cursor into the image list should pass it through
/// [`clamp_cursor`] afterwards.
///
/// # Errors
/// [`DoctorError::NotFound`] if no image has this id; nothing is modified.
pub fn delete_image(
    dataset: &mut Dataset,
    paths: &mut ImagePaths,
    id: ImageId,
) -> Result<DeleteImageReport, DoctorError> {
    if !dataset.images.iter().any(|img| img.id == id) {
        return Err(DoctorError::not_found(RecordKind::Image, id.as_u64()));
    }

    dataset.images.retain(|img| img.id != id);
    let before = dataset.annotations.len();
    dataset.annotations.retain(|ann| ann.image_id != id);
    paths.remove(id);

    Ok(DeleteImageReport {
        annotations_removed: before - dataset.annotations.len(),
    })
}

/// Clamps a cursor into `0..len`; `None` when nothing is left to point at.
pub fn clamp_cursor(cursor: usize, len: usize) -> Option<usize> {
    len.checked_sub(1).map(|last| cursor.min(last))
}
