//! COCO JSON decoding and encoding.
//!
//! The record types in [`super::model`] mirror the COCO schema directly, so
//! decoding is a single serde pass and nothing is lost on the way back out:
//! unknown keys ride along in each record's `extra` bag.
//!
//! Decoding fails as a whole on structurally invalid input (for example a
//! missing `images`, `annotations` or `categories` array); a dataset is
//! never partially populated. Duplicate ids and dangling references are not
//! checked here, see [`super::Index`] and [`crate::validation`].
//!
//! # Output Order
//!
//! Records are written in their in-memory order. After a merge that order is
//! "target records, then imported records", which keeps diffs against the
//! original file small.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::model::Dataset;
use crate::error::DoctorError;

/// Reads a dataset from a COCO JSON file.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use coco_doctor::dataset::io_coco_json::read_coco_json;
///
/// let dataset = read_coco_json(Path::new("instances.json"))?;
/// # Ok::<(), coco_doctor::DoctorError>(())
/// ```
pub fn read_coco_json(path: &Path) -> Result<Dataset, DoctorError> {
    let file = File::open(path).map_err(DoctorError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| DoctorError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a dataset to a COCO JSON file (compact).
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), DoctorError> {
    let file = File::create(path).map_err(DoctorError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, dataset).map_err(|source| {
        DoctorError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(DoctorError::Io)
}

/// Decodes a dataset from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<Dataset, DoctorError> {
    serde_json::from_str(json).map_err(DoctorError::CocoJsonDecode)
}

/// Decodes a dataset from raw COCO JSON bytes.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, DoctorError> {
    serde_json::from_slice(bytes).map_err(DoctorError::CocoJsonDecode)
}

/// Encodes a dataset as a pretty-printed COCO JSON string.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, DoctorError> {
    serde_json::to_string_pretty(dataset).map_err(DoctorError::CocoJsonEncode)
}

/// Encodes a dataset as compact COCO JSON bytes.
pub fn to_coco_vec(dataset: &Dataset) -> Result<Vec<u8>, DoctorError> {
    serde_json::to_vec(dataset).map_err(DoctorError::CocoJsonEncode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AnnotationId, ImageId};
    use serde_json::json;

    fn sample_coco_json() -> &'static str {
        r#"{
            "info": {"year": 2024, "version": "1.0", "description": "Test dataset"},
            "licenses": [{"id": 1, "name": "CC BY 4.0"}],
            "images": [
                {"id": 1, "width": 640, "height": 480, "file_name": "image001.jpg", "license": 1}
            ],
            "categories": [
                {"id": 1, "name": "person", "supercategory": "human", "keypoints": []}
            ],
            "annotations": [
                {
                    "id": 1,
                    "image_id": 1,
                    "category_id": 1,
                    "bbox": [10.0, 20.0, 90.0, 60.0],
                    "area": 5400.0,
                    "iscrowd": 0
                }
            ]
        }"#
    }

    #[test]
    fn test_decode_basic() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");

        assert_eq!(dataset.images.len(), 1);
        assert_eq!(dataset.categories.len(), 1);
        assert_eq!(dataset.annotations.len(), 1);

        let img = &dataset.images[0];
        assert_eq!(img.id, ImageId(1));
        assert_eq!(img.width, Some(640));
        assert_eq!(img.extra.get("license"), Some(&json!(1)));

        let cat = &dataset.categories[0];
        assert_eq!(cat.supercategory.as_deref(), Some("human"));
        assert_eq!(cat.extra.get("keypoints"), Some(&json!([])));

        let ann = &dataset.annotations[0];
        assert_eq!(ann.id, AnnotationId(1));
        assert_eq!(ann.bbox, Some([10.0, 20.0, 90.0, 60.0]));
        assert_eq!(ann.iscrowd, Some(0));
        assert!(ann.segmentation.is_none());

        assert_eq!(dataset.extra.get("info").unwrap()["year"], 2024);
        assert!(dataset.extra.contains_key("licenses"));
    }

    #[test]
    fn test_roundtrip_is_lossless() {
        let original = from_coco_str(sample_coco_json()).expect("parse failed");

        let json = to_coco_string(&original).expect("serialize failed");
        let restored = from_coco_str(&json).expect("parse failed");
        assert_eq!(original, restored);

        let bytes = to_coco_vec(&original).expect("serialize failed");
        let restored = from_coco_slice(&bytes).expect("parse failed");
        assert_eq!(original, restored);
    }

    #[test]
    fn test_roundtrip_keeps_null_fields() {
        let json = r#"{
            "images": [{"id": 1, "file_name": "a.jpg", "width": null, "height": null}],
            "categories": [{"id": 1, "name": "cat", "supercategory": null}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1,
                 "bbox": null, "iscrowd": null, "segmentation": null}
            ]
        }"#;
        let dataset = from_coco_str(json).unwrap();
        let encoded: serde_json::Value =
            serde_json::from_str(&to_coco_string(&dataset).unwrap()).unwrap();

        let ann = encoded["annotations"][0].as_object().unwrap();
        for key in ["bbox", "iscrowd", "segmentation"] {
            assert_eq!(ann.get(key), Some(&serde_json::Value::Null), "{key}");
        }
        let img = encoded["images"][0].as_object().unwrap();
        assert_eq!(img.get("width"), Some(&serde_json::Value::Null));
        assert_eq!(img.get("height"), Some(&serde_json::Value::Null));
        assert_eq!(
            encoded["categories"][0].get("supercategory"),
            Some(&serde_json::Value::Null)
        );
        assert_eq!(from_coco_str(&to_coco_string(&dataset).unwrap()).unwrap(), dataset);
    }

    #[test]
    fn test_missing_collection_is_format_error() {
        for missing in ["images", "annotations", "categories"] {
            let mut value = json!({"images": [], "annotations": [], "categories": []});
            value.as_object_mut().unwrap().remove(missing);

            let err = from_coco_str(&value.to_string()).unwrap_err();
            assert!(err.is_format_error(), "missing {missing} should fail: {err}");
        }
    }

    #[test]
    fn test_malformed_record_is_format_error() {
        let json = r#"{"images": [{"id": "one", "file_name": "a.jpg"}], "annotations": [], "categories": []}"#;
        assert!(from_coco_str(json).unwrap_err().is_format_error());
        assert!(from_coco_slice(b"not json").unwrap_err().is_format_error());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.json");
        let dataset = from_coco_str(sample_coco_json()).unwrap();

        write_coco_json(&path, &dataset).unwrap();
        assert_eq!(read_coco_json(&path).unwrap(), dataset);
    }

    #[test]
    fn test_read_reports_path_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"images\": []}").unwrap();

        match read_coco_json(&path) {
            Err(DoctorError::CocoJsonParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
