//! End-to-end walkthroughs of the merge, delete and repair flows on small,
//! hand-built datasets.

use std::path::Path;

use coco_doctor::dataset::io_coco_json::{from_coco_str, to_coco_vec};
use coco_doctor::dataset::{
    resolve_image_paths, Annotation, AnnotationId, BaseDirResolver, Category, CategoryId,
    Dataset, Image, ImageId, Index,
};
use coco_doctor::merge::{merge_datasets, MergeOptions};
use coco_doctor::mutate::{clamp_cursor, delete_image, repair_fields};
use coco_doctor::reconcile::{CategoryMapping, CategoryPolicy};
use coco_doctor::validation::{validate_dataset, ValidateOptions};
use coco_doctor::{DoctorError, PolicyConflict};

#[test]
fn scenario_a_strict_merge() {
    let mut target = Dataset::new(
        vec![Image::new(101u64, "t101.jpg", 640, 480)],
        vec![Category::new(1u64, "cat"), Category::new(2u64, "dog")],
        vec![Annotation::new(1u64, 101u64, 1u64, [0.0, 0.0, 10.0, 10.0])],
    );
    let source = Dataset::new(
        vec![Image::new(5u64, "s5.jpg", 320, 240)],
        vec![Category::new(1u64, "cat")],
        vec![Annotation::new(1u64, 5u64, 1u64, [1.0, 1.0, 5.0, 5.0])],
    );
    let mut paths = resolve_image_paths(&target, Path::new("/data/target"));

    let report = merge_datasets(
        &mut target,
        &mut paths,
        &source,
        &BaseDirResolver::new("/data/source"),
        &MergeOptions::default(),
    )
    .unwrap();

    let image_ids: Vec<ImageId> = target.images.iter().map(|i| i.id).collect();
    assert_eq!(image_ids, vec![ImageId(101), ImageId(107)]);
    let ann_ids: Vec<AnnotationId> = target.annotations.iter().map(|a| a.id).collect();
    assert_eq!(ann_ids, vec![AnnotationId(1), AnnotationId(2)]);
    assert_eq!(target.annotations[1].image_id, ImageId(107));
    assert_eq!(target.annotations[1].category_id, CategoryId(1));

    assert_eq!(paths.get(ImageId(107)), Some(Path::new("/data/source/s5.jpg")));
    assert!(report.is_lossless());
    assert!(validate_dataset(&target, &ValidateOptions::default()).is_ok());
}

#[test]
fn scenario_b_delete_image() {
    let mut dataset = Dataset::new(
        vec![
            Image::new(101u64, "a.jpg", 10, 10),
            Image::new(102u64, "b.jpg", 10, 10),
        ],
        vec![Category::new(1u64, "cat")],
        vec![
            Annotation::new(1u64, 101u64, 1u64, [0.0, 0.0, 1.0, 1.0]),
            Annotation::new(2u64, 102u64, 1u64, [0.0, 0.0, 1.0, 1.0]),
        ],
    );
    let mut paths = resolve_image_paths(&dataset, Path::new("/img"));
    let cursor = 1;

    let report = delete_image(&mut dataset, &mut paths, ImageId(101)).unwrap();

    assert_eq!(report.annotations_removed, 1);
    assert_eq!(dataset.annotations.len(), 1);
    assert_eq!(dataset.annotations[0].id, AnnotationId(2));
    assert!(dataset.images.iter().all(|img| img.id != ImageId(101)));
    assert!(!paths.contains(ImageId(101)));
    assert_eq!(clamp_cursor(cursor, dataset.images.len()), Some(0));

    let index = Index::build(&dataset).unwrap();
    assert!(matches!(
        index.annotations_for_image(ImageId(101)),
        Err(DoctorError::NotFound { .. })
    ));
}

#[test]
fn scenario_c_repair_is_byte_stable() {
    let mut dataset = from_coco_str(
        r#"{
            "images": [{"id": 1, "file_name": "a.jpg", "width": 1, "height": 1}],
            "categories": [{"id": 1, "name": "cat"}],
            "annotations": [{"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 1, 1]}]
        }"#,
    )
    .unwrap();

    repair_fields(&mut dataset);
    let ann = &dataset.annotations[0];
    assert_eq!(ann.iscrowd, Some(0));
    assert_eq!(ann.segmentation, Some(serde_json::json!([])));
    let once = to_coco_vec(&dataset).unwrap();

    let report = repair_fields(&mut dataset);
    assert_eq!(report.total(), 0);
    assert_eq!(to_coco_vec(&dataset).unwrap(), once);
}

#[test]
fn operator_corrects_rejected_mapping() {
    let mut target = Dataset::new(
        vec![Image::new(1u64, "t.jpg", 8, 8)],
        vec![Category::new(1u64, "cat"), Category::new(2u64, "dog")],
        vec![Annotation::new(1u64, 1u64, 1u64, [0.0, 0.0, 1.0, 1.0])],
    );
    let source = Dataset::new(
        vec![Image::new(1u64, "s.jpg", 8, 8)],
        vec![Category::new(4u64, "bird")],
        vec![Annotation::new(9u64, 1u64, 4u64, [0.0, 0.0, 1.0, 1.0])],
    );
    let mut paths = resolve_image_paths(&target, Path::new("/t"));
    let resolver = BaseDirResolver::new("/s");

    let mut mapping = CategoryMapping::propose(&target, &source);
    assert_eq!(mapping.resolve(CategoryId(4)), Some(CategoryId(3)));

    mapping.assign(CategoryId(4), CategoryId(2)).unwrap();
    let before = target.clone();
    let err = merge_datasets(
        &mut target,
        &mut paths,
        &source,
        &resolver,
        &MergeOptions {
            policy: CategoryPolicy::Mapped(mapping.clone()),
            ..MergeOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DoctorError::PolicyConflict(PolicyConflict::CollidesWithExisting { .. })
    ));
    assert_eq!(target, before);
    assert_eq!(paths.len(), 1);

    mapping.assign(CategoryId(4), CategoryId(10)).unwrap();
    let report = merge_datasets(
        &mut target,
        &mut paths,
        &source,
        &resolver,
        &MergeOptions {
            policy: CategoryPolicy::Mapped(mapping),
            ..MergeOptions::default()
        },
    )
    .unwrap();

    assert_eq!(report.categories_created, 1);
    assert_eq!(target.categories[2].id, CategoryId(10));
    assert_eq!(target.categories[2].name, "bird");
    assert_eq!(target.annotations[1].category_id, CategoryId(10));
    assert_eq!(target.annotations[1].image_id, ImageId(3));
    assert_eq!(paths.len(), 2);
}
