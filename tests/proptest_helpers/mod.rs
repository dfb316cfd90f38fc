#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use coco_doctor::dataset::{Annotation, Category, CategoryId, Dataset, Image, ImageId, Index};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use serde_json::{json, Value};

pub const CATEGORY_NAMES: &[&str] = &["cat", "dog", "bird", "car", "person", "tree"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

fn arb_opaque_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
        proptest::collection::vec(0u8..10, 0..4).prop_map(|v| json!(v)),
    ]
}

fn arb_extra() -> impl Strategy<Value = serde_json::Map<String, Value>> {
    proptest::collection::btree_map("x_[a-z]{1,6}", arb_opaque_value(), 0..3)
        .prop_map(|m| m.into_iter().collect())
}

fn unique_ids(range: std::ops::Range<u64>, max: usize) -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::btree_set(range, 0..=max)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// A dataset whose ids are unique per collection and whose annotations only
/// reference existing images and categories. Optional fields and opaque
/// extras vary freely.
pub fn arb_valid_dataset(
    max_images: usize,
    max_categories: usize,
    max_annotations: usize,
) -> BoxedStrategy<Dataset> {
    (
        unique_ids(1..10_000, max_images),
        unique_ids(1..50, max_categories),
    )
        .prop_flat_map(move |(image_ids, category_ids)| {
            let images = image_ids
                .iter()
                .map(|&id| {
                    (
                        "[a-z]{1,8}\\.jpg",
                        proptest::option::of(1u32..4096),
                        proptest::option::of(1u32..4096),
                        arb_extra(),
                    )
                        .prop_map(move |(file_name, width, height, extra)| Image {
                            id: ImageId(id),
                            file_name,
                            width,
                            height,
                            extra,
                        })
                })
                .collect::<Vec<_>>();

            let categories = category_ids
                .iter()
                .map(|&id| {
                    proptest::sample::select(CATEGORY_NAMES).prop_map(move |name| {
                        Category::new(id, name)
                    })
                })
                .collect::<Vec<_>>();

            let annotations = if image_ids.is_empty() || category_ids.is_empty() {
                Just(Vec::new()).boxed()
            } else {
                let image_ids = image_ids.clone();
                let category_ids = category_ids.clone();
                unique_ids(1..100_000, max_annotations)
                    .prop_flat_map(move |ann_ids| {
                        let image_ids = image_ids.clone();
                        let category_ids = category_ids.clone();
                        ann_ids
                            .into_iter()
                            .map(|id| {
                                arb_annotation(id, image_ids.clone(), category_ids.clone())
                            })
                            .collect::<Vec<_>>()
                    })
                    .boxed()
            };

            (images, categories, annotations, arb_extra())
        })
        .prop_map(|(images, categories, annotations, extra)| {
            let mut dataset = Dataset::new(images, categories, annotations);
            dataset.extra = extra;
            dataset
        })
        .boxed()
}

fn arb_annotation(
    id: u64,
    image_ids: Vec<u64>,
    category_ids: Vec<u64>,
) -> impl Strategy<Value = Annotation> {
    (
        proptest::sample::select(image_ids),
        proptest::sample::select(category_ids),
        proptest::option::of((0u16..1000, 0u16..1000, 1u16..500, 1u16..500)),
        proptest::option::of(0u8..=1),
        proptest::option::of(prop_oneof![
            Just(Value::Null),
            Just(json!([])),
            Just(json!([[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]])),
        ]),
        arb_extra(),
    )
        .prop_map(
            move |(image_id, category_id, bbox, iscrowd, segmentation, extra)| Annotation {
                id: id.into(),
                image_id: ImageId(image_id),
                category_id: CategoryId(category_id),
                bbox: bbox.map(|(x, y, w, h)| [x as f64, y as f64, w as f64, h as f64]),
                iscrowd,
                segmentation,
                extra,
            },
        )
}

/// Cross-reference invariants that must hold for every dataset the engine
/// hands back: unique ids, no dangling image or category reference.
pub fn assert_consistent(dataset: &Dataset) -> Result<(), String> {
    Index::build(dataset).map_err(|e| e.to_string())?;

    let images: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let categories: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();
    for ann in &dataset.annotations {
        if !images.contains(&ann.image_id) {
            return Err(format!(
                "annotation {} references missing image {}",
                ann.id, ann.image_id
            ));
        }
        if !categories.contains(&ann.category_id) {
            return Err(format!(
                "annotation {} references missing category {}",
                ann.id, ann.category_id
            ));
        }
    }
    Ok(())
}

/// Annotation bboxes grouped by the file name of their image, sorted; a
/// fingerprint of the annotation content that ignores every id.
pub fn boxes_by_file(dataset: &Dataset) -> BTreeMap<String, Vec<String>> {
    let files: BTreeMap<ImageId, &str> = dataset
        .images
        .iter()
        .map(|img| (img.id, img.file_name.as_str()))
        .collect();
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for ann in &dataset.annotations {
        let file = files.get(&ann.image_id).copied().unwrap_or("<missing>");
        out.entry(file.to_string())
            .or_default()
            .push(format!("{:?}", ann.bbox));
    }
    for boxes in out.values_mut() {
        boxes.sort();
    }
    out
}

pub fn category_ids(dataset: &Dataset) -> BTreeSet<CategoryId> {
    dataset.categories.iter().map(|c| c.id).collect()
}
