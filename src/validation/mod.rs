//! Dataset validation.
//!
//! Unlike [`crate::dataset::Index::build`], which stops at the first
//! duplicate id, validation walks the whole dataset and reports every
//! problem it finds:
//! - Structural integrity (unique ids, valid image/category references)
//! - Record quality (names, file names, image dimensions)
//! - Fields the repair passes would fill in

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::dataset::{AnnotationId, CategoryId, Dataset, ImageId};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates a dataset and returns a report of all issues found.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);

    report
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();
    let annotated: HashSet<ImageId> = dataset.annotations.iter().map(|a| a.image_id).collect();
    let mut unannotated = 0usize;

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        match (image.width, image.height) {
            (Some(w), Some(h)) if w == 0 || h == 0 => {
                report.add(ValidationIssue::error(
                    IssueCode::InvalidImageDimensions,
                    format!("Invalid dimensions {}x{} (must be positive)", w, h),
                    IssueContext::Image { id },
                ));
            }
            (Some(_), Some(_)) => {}
            _ => {
                report.add(ValidationIssue::warning(
                    IssueCode::MissingImageDimensions,
                    "Missing width and/or height",
                    IssueContext::Image { id },
                ));
            }
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        }

        if !annotated.contains(&image.id) {
            unannotated += 1;
        }
    }

    if unannotated > 0 {
        report.add(ValidationIssue::warning(
            IssueCode::UnannotatedImages,
            format!("{} image(s) have no annotations", unannotated),
            IssueContext::Dataset,
        ));
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        } else if let Some(first_id) = seen_names.get(category.name.as_str()) {
            // Name matching during a merge picks the first of these.
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(&category.name, category.id);
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();
    let mut missing_iscrowd = 0usize;
    let mut missing_segmentation = 0usize;

    for (idx, annotation) in dataset.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        if !annotation.has_iscrowd() {
            missing_iscrowd += 1;
        }
        if !annotation.has_segmentation() {
            missing_segmentation += 1;
        }
    }

    if missing_iscrowd > 0 {
        report.add(ValidationIssue::warning(
            IssueCode::MissingIscrowd,
            format!("{} annotation(s) lack an 'iscrowd' field", missing_iscrowd),
            IssueContext::Dataset,
        ));
    }
    if missing_segmentation > 0 {
        report.add(ValidationIssue::warning(
            IssueCode::MissingSegmentation,
            format!(
                "{} annotation(s) lack a 'segmentation' field",
                missing_segmentation
            ),
            IssueContext::Dataset,
        ));
    }
}
