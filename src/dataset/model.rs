//! COCO record types.
//!
//! Each record has the fields the engine reads or rewrites, plus an opaque
//! `extra` bag holding every other key exactly as it was decoded. Nothing in
//! the bag is interpreted, and all of it is written back out on encode.
//!
//! An optional typed field that is present with a JSON `null` decodes to
//! `None` and its key stays in `extra`, so the `null` survives a round trip.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{AnnotationId, CategoryId, ImageId};

/// Unrecognized fields of a record, preserved verbatim.
pub type Extra = Map<String, Value>;

/// One COCO-style collection of images, categories and annotations.
///
/// Top-level keys other than the three collections (`info`, `licenses`, ...)
/// live in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// All images, in file order.
    pub images: Vec<Image>,

    /// All annotations, in file order.
    pub annotations: Vec<Annotation>,

    /// All categories, in file order.
    pub categories: Vec<Category>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Dataset {
    /// Creates a dataset from its three collections.
    pub fn new(
        images: Vec<Image>,
        categories: Vec<Category>,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            images,
            annotations,
            categories,
            extra: Extra::new(),
        }
    }
}

/// An image record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Extra")]
pub struct Image {
    pub id: ImageId,

    /// File name relative to the dataset's image directory.
    pub file_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Image {
    /// Creates an image with known dimensions.
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width: Some(width),
            height: Some(height),
            extra: Extra::new(),
        }
    }

    /// Adds an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A category (class label) record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Extra")]
pub struct Category {
    pub id: CategoryId,

    /// Human-readable name; the key used when matching categories across
    /// datasets. Not guaranteed unique.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            extra: Extra::new(),
        }
    }

    pub fn with_supercategory(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            supercategory: Some(supercategory.into()),
            ..Self::new(id, name)
        }
    }
}

/// An annotation record.
///
/// `iscrowd` and `segmentation` are optional because real-world files often
/// omit them; the repair passes in [`crate::mutate`] fill them in. A key
/// present with a JSON `null` value counts as present: `segmentation` keeps
/// it as `Some(Value::Null)`, `iscrowd` keeps it in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Extra")]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,

    /// COCO box: `[x, y, width, height]` in pixels, top-left origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Value>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Annotation {
    /// Creates an annotation with a bounding box and no optional fields.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: [f64; 4],
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox: Some(bbox),
            iscrowd: None,
            segmentation: None,
            extra: Extra::new(),
        }
    }

    pub fn with_iscrowd(mut self, iscrowd: u8) -> Self {
        self.iscrowd = Some(iscrowd);
        self
    }

    pub fn with_segmentation(mut self, segmentation: Value) -> Self {
        self.segmentation = Some(segmentation);
        self
    }

    /// Adds an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether the record has an `iscrowd` key, `null` included.
    pub fn has_iscrowd(&self) -> bool {
        self.iscrowd.is_some() || self.extra.contains_key("iscrowd")
    }

    /// Whether the record has a `segmentation` key, `null` included.
    pub fn has_segmentation(&self) -> bool {
        self.segmentation.is_some()
    }
}

impl TryFrom<Extra> for Image {
    type Error = serde_json::Error;

    fn try_from(mut record: Extra) -> Result<Self, Self::Error> {
        Ok(Self {
            id: take_required(&mut record, "id")?,
            file_name: take_required(&mut record, "file_name")?,
            width: take_optional(&mut record, "width")?,
            height: take_optional(&mut record, "height")?,
            extra: record,
        })
    }
}

impl TryFrom<Extra> for Category {
    type Error = serde_json::Error;

    fn try_from(mut record: Extra) -> Result<Self, Self::Error> {
        Ok(Self {
            id: take_required(&mut record, "id")?,
            name: take_required(&mut record, "name")?,
            supercategory: take_optional(&mut record, "supercategory")?,
            extra: record,
        })
    }
}

impl TryFrom<Extra> for Annotation {
    type Error = serde_json::Error;

    fn try_from(mut record: Extra) -> Result<Self, Self::Error> {
        Ok(Self {
            id: take_required(&mut record, "id")?,
            image_id: take_required(&mut record, "image_id")?,
            category_id: take_required(&mut record, "category_id")?,
            bbox: take_optional(&mut record, "bbox")?,
            iscrowd: take_optional(&mut record, "iscrowd")?,
            segmentation: record.remove("segmentation"),
            extra: record,
        })
    }
}

fn take_required<T: DeserializeOwned>(
    record: &mut Extra,
    key: &'static str,
) -> Result<T, serde_json::Error> {
    let value = record
        .remove(key)
        .ok_or_else(|| <serde_json::Error as de::Error>::missing_field(key))?;
    serde_json::from_value(value)
}

// `null` is left in the record so it is written back out unchanged.
fn take_optional<T: DeserializeOwned>(
    record: &mut Extra,
    key: &str,
) -> Result<Option<T>, serde_json::Error> {
    if matches!(record.get(key), None | Some(Value::Null)) {
        return Ok(None);
    }
    record.remove(key).map(serde_json::from_value).transpose()
}
