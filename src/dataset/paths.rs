//! Image-ID to file-path bookkeeping.
//!
//! COCO image records carry only a `file_name` relative to some image
//! directory. Once two datasets from different directories are merged, the
//! directory is per-image, so the caller keeps an explicit [`ImagePaths`]
//! map alongside the dataset: the merge engine adds entries for imported
//! images and image deletion removes them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::ids::ImageId;
use super::model::{Dataset, Image};

/// Absolute (or caller-relative) file path of every image in a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImagePaths {
    paths: BTreeMap<ImageId, PathBuf>,
}

impl ImagePaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ImageId) -> Option<&Path> {
        self.paths.get(&id).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, id: ImageId, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.paths.insert(id, path.into())
    }

    pub fn remove(&mut self, id: ImageId) -> Option<PathBuf> {
        self.paths.remove(&id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Entries in ascending image-id order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &Path)> {
        self.paths.iter().map(|(id, path)| (*id, path.as_path()))
    }
}

impl FromIterator<(ImageId, PathBuf)> for ImagePaths {
    fn from_iter<T: IntoIterator<Item = (ImageId, PathBuf)>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Maps an image record of some dataset to the file holding its pixels.
pub trait ImagePathResolver {
    fn resolve(&self, image: &Image) -> PathBuf;
}

/// Resolves images as `base_dir/file_name`.
#[derive(Clone, Debug)]
pub struct BaseDirResolver {
    base_dir: PathBuf,
}

impl BaseDirResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ImagePathResolver for BaseDirResolver {
    fn resolve(&self, image: &Image) -> PathBuf {
        self.base_dir.join(&image.file_name)
    }
}

impl<F> ImagePathResolver for F
where
    F: Fn(&Image) -> PathBuf,
{
    fn resolve(&self, image: &Image) -> PathBuf {
        self(image)
    }
}

/// Builds the path map for every image of `dataset` under `base_dir`.
///
/// Pure: no file is touched and existence is not checked.
pub fn resolve_image_paths(dataset: &Dataset, base_dir: &Path) -> ImagePaths {
    let resolver = BaseDirResolver::new(base_dir);
    dataset
        .images
        .iter()
        .map(|img| (img.id, resolver.resolve(img)))
        .collect()
}
