//! Export of a curated dataset to a self-contained directory.
//!
//! Layout:
//!
//! ```text
//! out_dir/
//!   annotations/instances.json
//!   images/<file_name>...
//! ```
//!
//! Images are copied from the path map. A destination file that already
//! exists is left alone, so re-running an export only copies what is new.
//! Per-image copy failures are collected in the report instead of aborting.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::dataset::io_coco_json::write_coco_json;
use crate::dataset::{Dataset, Image, ImageId, ImagePaths};
use crate::error::DoctorError;

/// Annotation file path relative to the export directory.
pub const ANNOTATIONS_FILE: &str = "annotations/instances.json";
/// Image directory relative to the export directory.
pub const IMAGES_DIR: &str = "images";

/// Outcome of an export.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExportReport {
    pub annotations_path: PathBuf,
    pub images_copied: usize,
    /// Destination already present; not overwritten.
    pub images_skipped_existing: usize,
    /// Images with no entry in the path map.
    pub images_without_path: Vec<ImageId>,
    pub failures: Vec<CopyFailure>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.images_without_path.is_empty() && self.failures.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CopyFailure {
    pub image_id: ImageId,
    pub source: PathBuf,
    pub message: String,
}

/// Writes the dataset and copies its images under `out_dir`.
///
/// # Errors
/// Creating the output directories or writing the annotation file fails
/// the whole export. Failing to copy a single image does not; see
/// [`ExportReport::failures`].
pub fn export_dataset(
    dataset: &Dataset,
    paths: &ImagePaths,
    out_dir: &Path,
) -> Result<ExportReport, DoctorError> {
    let annotations_path = out_dir.join(ANNOTATIONS_FILE);
    if let Some(parent) = annotations_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let images_dir = out_dir.join(IMAGES_DIR);
    fs::create_dir_all(&images_dir)?;

    write_coco_json(&annotations_path, dataset)?;

    let mut report = ExportReport {
        annotations_path,
        ..ExportReport::default()
    };

    for image in &dataset.images {
        let Some(source) = paths.get(image.id) else {
            report.images_without_path.push(image.id);
            continue;
        };

        let dest = images_dir.join(export_relative_path(image, source));
        if dest.exists() {
            report.images_skipped_existing += 1;
            continue;
        }

        match copy_file(source, &dest) {
            Ok(()) => report.images_copied += 1,
            Err(err) => report.failures.push(CopyFailure {
                image_id: image.id,
                source: source.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    Ok(report)
}

// `file_name` is kept as-is when it is a plain relative path; anything that
// could escape the images directory falls back to the source's base name.
fn export_relative_path(image: &Image, source: &Path) -> PathBuf {
    let name = Path::new(&image.file_name);
    let plain = !image.file_name.is_empty()
        && name.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        return name.to_path_buf();
    }
    source
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("image_{}", image.id)))
}

fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest).map(|_| ())
}
