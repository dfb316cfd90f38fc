//! Collision-free identifier assignment for combining two datasets.
//!
//! [`plan_ids`] looks at an existing dataset (the target) and an incoming
//! one (the source) and decides, before a single record is copied, which id
//! every imported image, annotation and category receives and which source
//! annotations are left out.
//!
//! - Image ids are shifted: `new = old + max_target_image_id + 1`. Every
//!   shifted id exceeds the target's maximum, and distinct old ids stay
//!   distinct.
//! - Annotation ids are allocated upward from `max_target_annotation_id + 1`,
//!   one per imported annotation, in source order. An annotation's
//!   `image_id` always goes through the image table; image and annotation
//!   ids are separate namespaces and never share an offset.
//! - Category ids follow a [`CategoryPolicy`].

mod mapping;

pub use mapping::{CategoryMapping, MappingEntry};

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::dataset::{AnnotationId, CategoryId, ImageId, Index};
use crate::error::{DoctorError, RecordKind};

/// How incoming categories are reconciled with the target's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Category ids are taken as-is; annotations whose category id is not
    /// already a target category are dropped.
    Strict,
    /// Category ids are resolved through an operator-reviewed mapping.
    Mapped(CategoryMapping),
}

impl CategoryPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CategoryPolicy::Strict => "strict",
            CategoryPolicy::Mapped(_) => "mapped",
        }
    }
}

/// Why a source annotation is not imported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Strict policy: the category id is not a target category.
    CategoryNotInTarget,
    /// Mapped policy: the category has no mapping entry or was skipped.
    UnresolvedMapping,
    /// The annotation's image is absent from the source dataset.
    MissingImage,
}

/// A source annotation left out of the merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exclusion {
    pub annotation: AnnotationId,
    pub reason: DropReason,
}

/// Complete re-id plan for one merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdPlan {
    /// Old -> new id for every source image that will be imported: those
    /// referenced by an imported annotation, or all of them when unannotated
    /// images are kept.
    pub images: BTreeMap<ImageId, ImageId>,
    /// Old -> new id for every imported source annotation.
    pub annotations: BTreeMap<AnnotationId, AnnotationId>,
    /// Source category id -> resolved target category id.
    pub categories: BTreeMap<CategoryId, CategoryId>,
    /// Source annotations that will not be imported, in source order.
    pub excluded: Vec<Exclusion>,
    /// Resolved category ids that do not exist in the target yet.
    pub new_categories: BTreeSet<CategoryId>,
}

impl IdPlan {
    pub fn excluded_count(&self, reason: DropReason) -> usize {
        self.excluded.iter().filter(|e| e.reason == reason).count()
    }
}

/// Computes the id plan for merging `source` into `target`.
///
/// Source images without an imported annotation get no id unless
/// `keep_unannotated_images` is set.
///
/// # Errors
/// - [`DoctorError::PolicyConflict`] when a mapped policy fails validation.
/// - [`DoctorError::IdOverflow`] when shifted ids do not fit in `u64`.
pub fn plan_ids(
    target: &Index<'_>,
    source: &Index<'_>,
    policy: &CategoryPolicy,
    keep_unannotated_images: bool,
) -> Result<IdPlan, DoctorError> {
    let target_ds = target.dataset();
    let source_ds = source.dataset();

    let categories: BTreeMap<CategoryId, CategoryId> = match policy {
        CategoryPolicy::Strict => source_ds
            .annotations
            .iter()
            .map(|ann| ann.category_id)
            .filter(|id| target.contains_category(*id))
            .map(|id| (id, id))
            .collect(),
        CategoryPolicy::Mapped(mapping) => {
            mapping.validate(target_ds, source_ds)?;
            mapping
                .entries()
                .iter()
                .filter_map(|e| e.target_id.map(|id| (e.source_id, id)))
                .collect()
        }
    };

    let new_categories = match policy {
        CategoryPolicy::Strict => BTreeSet::new(),
        CategoryPolicy::Mapped(mapping) => mapping.fresh_ids(target_ds).into_iter().collect(),
    };

    let unresolved = match policy {
        CategoryPolicy::Strict => DropReason::CategoryNotInTarget,
        CategoryPolicy::Mapped(_) => DropReason::UnresolvedMapping,
    };

    let mut next_annotation = target.max_annotation_id().map_or(0, |id| id.as_u64());
    let mut annotations = BTreeMap::new();
    let mut excluded = Vec::new();
    let mut referenced = HashSet::new();
    for ann in &source_ds.annotations {
        let reason = if !categories.contains_key(&ann.category_id) {
            Some(unresolved)
        } else if !source.contains_image(ann.image_id) {
            Some(DropReason::MissingImage)
        } else {
            None
        };

        match reason {
            Some(reason) => excluded.push(Exclusion {
                annotation: ann.id,
                reason,
            }),
            None => {
                next_annotation = next_annotation.checked_add(1).ok_or(DoctorError::IdOverflow {
                    kind: RecordKind::Annotation,
                })?;
                annotations.insert(ann.id, AnnotationId(next_annotation));
                referenced.insert(ann.image_id);
            }
        }
    }

    // Only images that will be imported need an id that fits.
    let image_offset = target
        .max_image_id()
        .map_or(0, |id| id.as_u64())
        .checked_add(1);
    let mut images = BTreeMap::new();
    for img in source_ds
        .images
        .iter()
        .filter(|img| keep_unannotated_images || referenced.contains(&img.id))
    {
        let shifted = image_offset
            .and_then(|offset| img.id.as_u64().checked_add(offset))
            .ok_or(DoctorError::IdOverflow {
                kind: RecordKind::Image,
            })?;
        images.insert(img.id, ImageId(shifted));
    }

    Ok(IdPlan {
        images,
        annotations,
        categories,
        excluded,
        new_categories,
    })
}
