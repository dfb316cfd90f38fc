//! Dataset inspection.
//!
//! Two views over a dataset:
//! - [`inspect_dataset`]: summary counts and the class list with
//!   per-category annotation counts.
//! - [`sample_at`]: one image with its annotations, addressed by a cursor
//!   into the image list. [`next_cursor`] and [`prev_cursor`] wrap around.

mod report;

pub use report::{ClassEntry, InspectReport, SampleAnnotation, SampleView, SummarySection};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::dataset::{CategoryId, Dataset, ImageId, ImagePaths, Index};
use crate::error::{DoctorError, RecordKind};
use crate::palette::CategoryColors;

/// Options for dataset inspection.
#[derive(Clone, Debug)]
pub struct InspectOptions {
    /// Width of the per-class bars (in characters).
    pub bar_width: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self { bar_width: 20 }
    }
}

/// Inspect a dataset and produce a summary report.
///
/// Classes are listed in ascending id order. Annotations whose category is
/// not in the dataset are counted in `unknown_category_annotations` rather
/// than attributed to a class.
pub fn inspect_dataset(dataset: &Dataset, opts: &InspectOptions) -> InspectReport {
    let mut per_category: HashMap<CategoryId, usize> = HashMap::new();
    for ann in &dataset.annotations {
        *per_category.entry(ann.category_id).or_insert(0) += 1;
    }

    let mut classes: Vec<ClassEntry> = dataset
        .categories
        .iter()
        .map(|cat| ClassEntry {
            id: cat.id,
            name: cat.name.clone(),
            annotations: per_category.get(&cat.id).copied().unwrap_or(0),
        })
        .collect();
    classes.sort_by_key(|c| c.id);

    let known: HashSet<CategoryId> = classes.iter().map(|c| c.id).collect();
    let unknown_category_annotations = per_category
        .iter()
        .filter(|(id, _)| !known.contains(*id))
        .map(|(_, count)| count)
        .sum();

    InspectReport {
        summary: compute_summary(dataset),
        classes,
        unknown_category_annotations,
        bar_width: opts.bar_width,
    }
}

fn compute_summary(dataset: &Dataset) -> SummarySection {
    let annotated_image_ids: HashSet<ImageId> =
        dataset.annotations.iter().map(|ann| ann.image_id).collect();
    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|img| img.id).collect();

    SummarySection {
        images: dataset.images.len(),
        categories: dataset.categories.len(),
        annotations: dataset.annotations.len(),
        annotated_images: annotated_image_ids.intersection(&image_ids).count(),
    }
}

/// Builds the view of the image at `cursor` (0-based position in the image
/// list).
///
/// Annotation labels come from the index; `paths` and `colors` are optional
/// extras shown alongside when present.
///
/// # Errors
/// [`DoctorError::NotFound`] when `cursor` is past the end of the image
/// list. The id in the error is the cursor position.
pub fn sample_at<'a>(
    index: &Index<'a>,
    cursor: usize,
    paths: Option<&ImagePaths>,
    colors: Option<&CategoryColors>,
) -> Result<SampleView<'a>, DoctorError> {
    let dataset = index.dataset();
    let image = dataset
        .images
        .get(cursor)
        .ok_or_else(|| DoctorError::not_found(RecordKind::Image, cursor as u64))?;

    let annotations = index
        .annotations_for_image(image.id)?
        .into_iter()
        .map(|ann| SampleAnnotation {
            annotation: ann,
            category_name: index
                .category(ann.category_id)
                .ok()
                .map(|cat| cat.name.as_str()),
            color: colors.and_then(|c| c.get(ann.category_id)),
        })
        .collect();

    Ok(SampleView {
        position: cursor + 1,
        total: dataset.images.len(),
        image,
        path: paths.and_then(|p| p.get(image.id)).map(Path::to_path_buf),
        annotations,
    })
}

/// Position of the image with the given id, for addressing [`sample_at`] by
/// id instead of position.
pub fn cursor_of(dataset: &Dataset, id: ImageId) -> Result<usize, DoctorError> {
    dataset
        .images
        .iter()
        .position(|img| img.id == id)
        .ok_or_else(|| DoctorError::not_found(RecordKind::Image, id.as_u64()))
}

/// Next cursor position, wrapping from the last image to the first.
pub fn next_cursor(cursor: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((cursor.min(len - 1) + 1) % len)
}

/// Previous cursor position, wrapping from the first image to the last.
pub fn prev_cursor(cursor: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((cursor.min(len - 1) + len - 1) % len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Annotation, Category, Image};

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                Image::new(10u64, "a.jpg", 640, 480),
                Image::new(20u64, "b.jpg", 640, 480),
                Image::new(30u64, "c.jpg", 640, 480),
            ],
            vec![Category::new(2u64, "dog"), Category::new(1u64, "cat")],
            vec![
                Annotation::new(1u64, 10u64, 1u64, [0.0, 0.0, 5.0, 5.0]),
                Annotation::new(2u64, 10u64, 2u64, [1.0, 1.0, 5.0, 5.0]),
                Annotation::new(3u64, 20u64, 1u64, [2.0, 2.0, 5.0, 5.0]),
                Annotation::new(4u64, 20u64, 9u64, [2.0, 2.0, 5.0, 5.0]),
            ],
        )
    }

    #[test]
    fn summary_counts() {
        let report = inspect_dataset(&dataset(), &InspectOptions::default());
        assert_eq!(report.summary.images, 3);
        assert_eq!(report.summary.categories, 2);
        assert_eq!(report.summary.annotations, 4);
        assert_eq!(report.summary.annotated_images, 2);
    }

    #[test]
    fn classes_sorted_by_id_with_counts() {
        let report = inspect_dataset(&dataset(), &InspectOptions::default());
        let labels: Vec<String> = report.classes.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["cat (1)", "dog (2)"]);
        assert_eq!(report.classes[0].annotations, 2);
        assert_eq!(report.classes[1].annotations, 1);
        assert_eq!(report.unknown_category_annotations, 1);
    }

    #[test]
    fn sample_view_lists_annotations() {
        let ds = dataset();
        let index = Index::build(&ds).unwrap();
        let view = sample_at(&index, 0, None, None).unwrap();

        assert_eq!(view.label(), "Image 1/3");
        assert_eq!(view.image.id, ImageId(10));
        assert_eq!(view.annotations.len(), 2);
        assert_eq!(view.annotations[1].category_name, Some("dog"));
    }

    #[test]
    fn sample_view_tolerates_unknown_category() {
        let ds = dataset();
        let index = Index::build(&ds).unwrap();
        let view = sample_at(&index, 1, None, None).unwrap();
        assert_eq!(view.annotations[1].category_name, None);
    }

    #[test]
    fn unannotated_image_has_empty_view() {
        let ds = dataset();
        let index = Index::build(&ds).unwrap();
        let view = sample_at(&index, 2, None, None).unwrap();
        assert!(view.annotations.is_empty());
    }

    #[test]
    fn cursor_past_end_is_not_found() {
        let ds = dataset();
        let index = Index::build(&ds).unwrap();
        assert!(matches!(
            sample_at(&index, 3, None, None),
            Err(DoctorError::NotFound { kind: RecordKind::Image, id: 3 })
        ));
    }

    #[test]
    fn cursor_lookup_by_id() {
        let ds = dataset();
        assert_eq!(cursor_of(&ds, ImageId(30)).unwrap(), 2);
        assert!(cursor_of(&ds, ImageId(31)).is_err());
    }

    #[test]
    fn navigation_wraps() {
        assert_eq!(next_cursor(2, 3), Some(0));
        assert_eq!(next_cursor(0, 3), Some(1));
        assert_eq!(prev_cursor(0, 3), Some(2));
        assert_eq!(prev_cursor(2, 3), Some(1));
        assert_eq!(next_cursor(0, 1), Some(0));
        assert_eq!(next_cursor(0, 0), None);
        assert_eq!(prev_cursor(0, 0), None);
    }
}
