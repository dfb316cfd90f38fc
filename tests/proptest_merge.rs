use std::collections::BTreeMap;

use coco_doctor::dataset::{resolve_image_paths, BaseDirResolver, CategoryId, Dataset};
use coco_doctor::merge::{merge_datasets, MergeOptions};
use coco_doctor::reconcile::{CategoryMapping, CategoryPolicy};
use coco_doctor::DoctorError;
use proptest::prelude::*;
use std::path::Path;

mod proptest_helpers;

fn source_boxes_kept_in(
    source: &Dataset,
    merged: &Dataset,
) -> Result<(), String> {
    let src = proptest_helpers::boxes_by_file(source);
    let dst = proptest_helpers::boxes_by_file(merged);
    for (file, boxes) in src {
        let Some(found) = dst.get(&file) else {
            return Err(format!("no annotations for {} after merge", file));
        };
        for b in boxes {
            if !found.contains(&b) {
                return Err(format!("box {} of {} missing after merge", b, file));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn strict_merge_is_collision_free_and_conserving(
        target in proptest_helpers::arb_valid_dataset(6, 5, 15),
        source in proptest_helpers::arb_valid_dataset(6, 5, 15),
    ) {
        let mut merged = target.clone();
        let mut paths = resolve_image_paths(&merged, Path::new("/t"));
        let report = merge_datasets(
            &mut merged,
            &mut paths,
            &source,
            &BaseDirResolver::new("/s"),
            &MergeOptions::default(),
        )
        .expect("strict merge of valid datasets succeeds");

        let res = proptest_helpers::assert_consistent(&merged);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());

        prop_assert_eq!(
            report.annotations_imported + report.annotations_dropped(),
            source.annotations.len()
        );
        prop_assert_eq!(
            merged.annotations.len(),
            target.annotations.len() + report.annotations_imported
        );
        prop_assert_eq!(
            report.images_imported + report.images_skipped_unannotated,
            source.images.len()
        );
        prop_assert_eq!(&merged.categories, &target.categories);
        prop_assert_eq!(&merged.annotations[..target.annotations.len()], &target.annotations[..]);

        let target_categories = proptest_helpers::category_ids(&target);
        let kept = source
            .annotations
            .iter()
            .filter(|a| target_categories.contains(&a.category_id))
            .count();
        prop_assert_eq!(report.annotations_imported, kept);

        prop_assert_eq!(paths.len(), merged.images.len());
        let max_target = target.images.iter().map(|i| i.id).max();
        for img in &merged.images[target.images.len()..] {
            prop_assert!(Some(img.id) > max_target);
        }
    }

    #[test]
    fn mapped_merge_is_consistent_or_untouched(
        target in proptest_helpers::arb_valid_dataset(5, 5, 10),
        source in proptest_helpers::arb_valid_dataset(5, 5, 10),
        overrides in proptest::collection::vec((0usize..5, 1u64..12, any::<bool>()), 0..3),
    ) {
        let mut mapping = CategoryMapping::propose(&target, &source);
        for (pos, id, skip) in overrides {
            let Some(entry) = source.categories.get(pos) else { continue };
            if skip {
                mapping.skip(entry.id).expect("known source category");
            } else {
                mapping.assign(entry.id, CategoryId(id)).expect("known source category");
            }
        }

        let mut merged = target.clone();
        let mut paths = resolve_image_paths(&merged, Path::new("/t"));
        let before_paths = paths.clone();
        let result = merge_datasets(
            &mut merged,
            &mut paths,
            &source,
            &BaseDirResolver::new("/s"),
            &MergeOptions {
                policy: CategoryPolicy::Mapped(mapping),
                keep_unannotated_images: true,
            },
        );

        match result {
            Ok(report) => {
                let res = proptest_helpers::assert_consistent(&merged);
                prop_assert!(res.is_ok(), "{}", res.unwrap_err());
                prop_assert_eq!(report.images_skipped_unannotated, 0);
                prop_assert_eq!(merged.images.len(), target.images.len() + source.images.len());
                prop_assert_eq!(
                    merged.categories.len(),
                    target.categories.len() + report.categories_created
                );
                prop_assert_eq!(
                    report.annotations_imported + report.annotations_dropped(),
                    source.annotations.len()
                );
            }
            Err(DoctorError::PolicyConflict(_)) => {
                prop_assert_eq!(&merged, &target);
                prop_assert_eq!(paths, before_paths);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn name_matched_merge_keeps_every_annotation(
        target in proptest_helpers::arb_valid_dataset(5, 5, 10),
        source in proptest_helpers::arb_valid_dataset(5, 5, 10),
    ) {
        // Distinct source names, so the name proposal never pairs two
        // source categories with one target id.
        let mut source = source;
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        for cat in &mut source.categories {
            let n = seen.entry(cat.name.clone()).or_insert(0);
            if *n > 0 {
                cat.name = format!("{}_{}", cat.name, n);
            }
            *n += 1;
        }

        let mapping = CategoryMapping::propose(&target, &source);
        let mut merged = target.clone();
        let mut paths = resolve_image_paths(&merged, Path::new("/t"));
        let report = merge_datasets(
            &mut merged,
            &mut paths,
            &source,
            &BaseDirResolver::new("/s"),
            &MergeOptions {
                policy: CategoryPolicy::Mapped(mapping),
                keep_unannotated_images: false,
            },
        )
        .expect("a name proposal with distinct names is valid");

        prop_assert_eq!(report.annotations_dropped(), 0);
        let res = source_boxes_kept_in(&source, &merged);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());
    }
}
