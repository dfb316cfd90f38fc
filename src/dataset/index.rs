//! Derived lookup tables over a [`Dataset`].
//!
//! An [`Index`] borrows the dataset it was built from, so the dataset cannot
//! be mutated while the index is alive. After any structural edit the old
//! index is gone and lookups require a fresh [`Index::build`]; a stale index
//! cannot be observed.

use std::collections::{BTreeSet, HashMap};

use super::ids::{AnnotationId, CategoryId, ImageId};
use super::model::{Annotation, Category, Dataset, Image};
use crate::error::{DoctorError, RecordKind};

/// Id-keyed views of a dataset's images, categories and annotations.
#[derive(Debug)]
pub struct Index<'a> {
    dataset: &'a Dataset,
    images: HashMap<ImageId, usize>,
    categories: HashMap<CategoryId, usize>,
    annotations: HashMap<AnnotationId, usize>,
    by_image: HashMap<ImageId, Vec<usize>>,
    by_category: HashMap<CategoryId, Vec<usize>>,
}

impl<'a> Index<'a> {
    /// Scans the dataset once and builds every lookup table.
    ///
    /// # Errors
    /// Returns [`DoctorError::Integrity`] when two records in the same
    /// collection share an id.
    pub fn build(dataset: &'a Dataset) -> Result<Self, DoctorError> {
        let mut images = HashMap::with_capacity(dataset.images.len());
        for (pos, image) in dataset.images.iter().enumerate() {
            if images.insert(image.id, pos).is_some() {
                return Err(DoctorError::Integrity {
                    kind: RecordKind::Image,
                    id: image.id.as_u64(),
                });
            }
        }

        let mut categories = HashMap::with_capacity(dataset.categories.len());
        for (pos, category) in dataset.categories.iter().enumerate() {
            if categories.insert(category.id, pos).is_some() {
                return Err(DoctorError::Integrity {
                    kind: RecordKind::Category,
                    id: category.id.as_u64(),
                });
            }
        }

        let mut annotations = HashMap::with_capacity(dataset.annotations.len());
        let mut by_image: HashMap<ImageId, Vec<usize>> = HashMap::new();
        let mut by_category: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        for (pos, ann) in dataset.annotations.iter().enumerate() {
            if annotations.insert(ann.id, pos).is_some() {
                return Err(DoctorError::Integrity {
                    kind: RecordKind::Annotation,
                    id: ann.id.as_u64(),
                });
            }
            by_image.entry(ann.image_id).or_default().push(pos);
            by_category.entry(ann.category_id).or_default().push(pos);
        }

        Ok(Self {
            dataset,
            images,
            categories,
            annotations,
            by_image,
            by_category,
        })
    }

    /// The dataset this index was built from.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn image(&self, id: ImageId) -> Result<&'a Image, DoctorError> {
        self.images
            .get(&id)
            .map(|&pos| &self.dataset.images[pos])
            .ok_or_else(|| DoctorError::not_found(RecordKind::Image, id.as_u64()))
    }

    pub fn category(&self, id: CategoryId) -> Result<&'a Category, DoctorError> {
        self.categories
            .get(&id)
            .map(|&pos| &self.dataset.categories[pos])
            .ok_or_else(|| DoctorError::not_found(RecordKind::Category, id.as_u64()))
    }

    pub fn annotation(&self, id: AnnotationId) -> Result<&'a Annotation, DoctorError> {
        self.annotations
            .get(&id)
            .map(|&pos| &self.dataset.annotations[pos])
            .ok_or_else(|| DoctorError::not_found(RecordKind::Annotation, id.as_u64()))
    }

    /// Annotations attached to an image, in dataset order.
    ///
    /// An existing image without annotations yields an empty list; an
    /// unknown image id is `NotFound`.
    pub fn annotations_for_image(&self, id: ImageId) -> Result<Vec<&'a Annotation>, DoctorError> {
        if !self.images.contains_key(&id) {
            return Err(DoctorError::not_found(RecordKind::Image, id.as_u64()));
        }
        Ok(self.collect(self.by_image.get(&id)))
    }

    /// Annotations labelled with a category, in dataset order.
    pub fn annotations_for_category(
        &self,
        id: CategoryId,
    ) -> Result<Vec<&'a Annotation>, DoctorError> {
        if !self.categories.contains_key(&id) {
            return Err(DoctorError::not_found(RecordKind::Category, id.as_u64()));
        }
        Ok(self.collect(self.by_category.get(&id)))
    }

    pub fn contains_image(&self, id: ImageId) -> bool {
        self.images.contains_key(&id)
    }

    pub fn contains_category(&self, id: CategoryId) -> bool {
        self.categories.contains_key(&id)
    }

    pub fn category_ids(&self) -> BTreeSet<CategoryId> {
        self.categories.keys().copied().collect()
    }

    pub fn max_image_id(&self) -> Option<ImageId> {
        self.images.keys().max().copied()
    }

    pub fn max_category_id(&self) -> Option<CategoryId> {
        self.categories.keys().max().copied()
    }

    pub fn max_annotation_id(&self) -> Option<AnnotationId> {
        self.annotations.keys().max().copied()
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<&'a Annotation> {
        positions
            .map(|list| list.iter().map(|&pos| &self.dataset.annotations[pos]).collect())
            .unwrap_or_default()
    }
}
