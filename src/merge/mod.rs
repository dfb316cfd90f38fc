//! Merging one COCO dataset into another.
//!
//! [`merge_datasets`] reconciles ids (see [`crate::reconcile`]), stages
//! every record it will import with its new ids, and only then appends the
//! staged records to the target. A merge that fails leaves the target and
//! its path map exactly as they were.

mod report;

pub use report::{DroppedAnnotations, MergeCounts, MergeReport};

use std::collections::HashSet;
use std::path::PathBuf;

use crate::dataset::{
    Annotation, Category, CategoryId, Dataset, Image, ImageId, ImagePathResolver, ImagePaths,
    Index,
};
use crate::error::{DoctorError, RecordKind};
use crate::reconcile::{self, CategoryPolicy, IdPlan};

/// Options for a merge.
#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub policy: CategoryPolicy,
    /// Also import source images that end up with no annotation. By default
    /// only annotated images are imported and the rest are counted in the
    /// report.
    pub keep_unannotated_images: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            policy: CategoryPolicy::Strict,
            keep_unannotated_images: false,
        }
    }
}

/// Records ready to append, already carrying their target ids.
struct Staged {
    images: Vec<Image>,
    paths: Vec<(ImageId, PathBuf)>,
    annotations: Vec<Annotation>,
    categories: Vec<Category>,
}

/// Merges `source` into `target`.
///
/// `target_paths` receives an entry for each imported image, resolved from
/// the image's source record by `resolver`.
///
/// # Errors
/// - [`DoctorError::Integrity`] if either dataset has duplicate ids.
/// - [`DoctorError::PolicyConflict`] if a mapped category policy is invalid.
/// - [`DoctorError::IdOverflow`] if new ids do not fit in `u64`.
///
/// On error nothing has been modified.
pub fn merge_datasets<R>(
    target: &mut Dataset,
    target_paths: &mut ImagePaths,
    source: &Dataset,
    resolver: &R,
    opts: &MergeOptions,
) -> Result<MergeReport, DoctorError>
where
    R: ImagePathResolver + ?Sized,
{
    let (plan, staged) = {
        let target_index = Index::build(target)?;
        let source_index = Index::build(source)?;
        let plan = reconcile::plan_ids(
            &target_index,
            &source_index,
            &opts.policy,
            opts.keep_unannotated_images,
        )?;
        let staged = stage(&source_index, &plan, resolver)?;
        (plan, staged)
    };

    let report = MergeReport {
        policy: opts.policy.name().to_string(),
        source: MergeCounts {
            images: source.images.len(),
            categories: source.categories.len(),
            annotations: source.annotations.len(),
        },
        images_imported: staged.images.len(),
        images_skipped_unannotated: source.images.len() - staged.images.len(),
        annotations_imported: staged.annotations.len(),
        dropped: DroppedAnnotations::from_plan(&plan),
        categories_created: staged.categories.len(),
    };

    target.images.extend(staged.images);
    target.annotations.extend(staged.annotations);
    target.categories.extend(staged.categories);
    for (id, path) in staged.paths {
        target_paths.insert(id, path);
    }

    debug_assert!(Index::build(target).is_ok());

    Ok(report)
}

fn stage<R>(
    source: &Index<'_>,
    plan: &IdPlan,
    resolver: &R,
) -> Result<Staged, DoctorError>
where
    R: ImagePathResolver + ?Sized,
{
    let dataset = source.dataset();

    let mut images = Vec::new();
    let mut paths = Vec::new();
    for img in &dataset.images {
        // Images without a planned id are skipped as unannotated.
        let Some(&new_id) = plan.images.get(&img.id) else {
            continue;
        };
        paths.push((new_id, resolver.resolve(img)));
        images.push(Image {
            id: new_id,
            ..img.clone()
        });
    }

    let mut annotations = Vec::with_capacity(plan.annotations.len());
    for ann in &dataset.annotations {
        let Some(&new_id) = plan.annotations.get(&ann.id) else {
            continue;
        };
        annotations.push(Annotation {
            id: new_id,
            image_id: lookup(&plan.images, ann.image_id, RecordKind::Image)?,
            category_id: lookup(&plan.categories, ann.category_id, RecordKind::Category)?,
            ..ann.clone()
        });
    }

    let mut created: HashSet<CategoryId> = HashSet::new();
    let mut categories = Vec::new();
    for cat in &dataset.categories {
        let Some(&resolved) = plan.categories.get(&cat.id) else {
            continue;
        };
        if plan.new_categories.contains(&resolved) && created.insert(resolved) {
            categories.push(Category {
                id: resolved,
                ..cat.clone()
            });
        }
    }

    Ok(Staged {
        images,
        paths,
        annotations,
        categories,
    })
}

fn lookup<K>(
    table: &std::collections::BTreeMap<K, K>,
    id: K,
    kind: RecordKind,
) -> Result<K, DoctorError>
where
    K: Ord + Copy + Into<u64>,
{
    table
        .get(&id)
        .copied()
        .ok_or_else(|| DoctorError::not_found(kind, id.into()))
}
