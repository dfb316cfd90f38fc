//! Newtype IDs for the three COCO record collections.
//!
//! Image, category and annotation ids are independent namespaces; the merge
//! engine remaps each through its own table, so mixing them up has to be a
//! compile error rather than a silent corruption.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id! {
    /// Identifier of an image, unique within one dataset.
    ImageId
}

record_id! {
    /// Identifier of a category, unique within one dataset.
    CategoryId
}

record_id! {
    /// Identifier of an annotation, unique within one dataset.
    AnnotationId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        assert!(ImageId(1) < ImageId(2));
        assert!(CategoryId(10) > CategoryId(5));
    }

    #[test]
    fn test_id_formatting() {
        assert_eq!(format!("{:?}", AnnotationId(7)), "AnnotationId(7)");
        assert_eq!(ImageId(101).to_string(), "101");
    }

    #[test]
    fn test_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&CategoryId(3)).unwrap();
        assert_eq!(json, "3");
        let back: CategoryId = serde_json::from_str("3").unwrap();
        assert_eq!(back, CategoryId(3));
    }
}
