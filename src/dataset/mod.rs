//! In-memory COCO dataset model.
//!
//! A [`Dataset`] is three ordered record collections (images, categories,
//! annotations) linked by integer ids. The engine keeps the following true
//! after every operation it performs:
//!
//! 1. every annotation's `image_id` names an image in the dataset;
//! 2. every annotation's `category_id` names a category in the dataset;
//! 3. ids are unique within each collection;
//! 4. lookups go through an [`Index`] built from the current contents.
//!
//! Datasets decoded from disk may violate 1-3; [`Index::build`] rejects
//! duplicate ids and [`crate::validation`] reports dangling references.
//!
//! # Example
//!
//! ```
//! use coco_doctor::dataset::{Annotation, Category, Dataset, Image, ImageId, Index};
//!
//! let dataset = Dataset::new(
//!     vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     vec![Category::new(1u64, "person")],
//!     vec![Annotation::new(1u64, 1u64, 1u64, [10.0, 20.0, 90.0, 180.0])],
//! );
//!
//! let index = Index::build(&dataset)?;
//! assert_eq!(index.annotations_for_image(ImageId(1))?.len(), 1);
//! # Ok::<(), coco_doctor::DoctorError>(())
//! ```

mod ids;
mod index;
pub mod io_coco_json;
mod model;
pub mod paths;

pub use ids::{AnnotationId, CategoryId, ImageId};
pub use index::Index;
pub use model::{Annotation, Category, Dataset, Extra, Image};
pub use paths::{resolve_image_paths, BaseDirResolver, ImagePathResolver, ImagePaths};
