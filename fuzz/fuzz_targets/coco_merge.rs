//! Fuzz target for merging two decoded datasets.
//!
//! The input is split at the first NUL byte into a target and a source
//! document. Whenever both decode and the strict merge succeeds, the merged
//! dataset must index cleanly.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_merge

#![no_main]

use coco_doctor::dataset::io_coco_json::from_coco_slice;
use coco_doctor::dataset::{resolve_image_paths, BaseDirResolver, Index};
use coco_doctor::merge::{merge_datasets, MergeOptions};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (Ok(mut target), Ok(source)) = (
        from_coco_slice(&data[..split]),
        from_coco_slice(&data[split + 1..]),
    ) else {
        return;
    };

    let mut paths = resolve_image_paths(&target, Path::new("t"));
    let resolver = BaseDirResolver::new("s");
    if merge_datasets(&mut target, &mut paths, &source, &resolver, &MergeOptions::default()).is_ok()
    {
        assert!(Index::build(&target).is_ok());
    }
});
