//! Fuzz target for COCO JSON parsing.
//!
//! Feeds arbitrary bytes to the COCO decoder. Anything that decodes is also
//! indexed, validated, repaired and re-encoded; none of that may panic, and
//! the re-encoded dataset must decode back to the same value.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use coco_doctor::dataset::io_coco_json::{from_coco_slice, to_coco_vec};
use coco_doctor::dataset::Index;
use coco_doctor::mutate::repair_fields;
use coco_doctor::validation::{validate_dataset, ValidateOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for JSON annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(mut dataset) = from_coco_slice(data) else {
        return;
    };

    let _ = Index::build(&dataset);
    let _ = validate_dataset(&dataset, &ValidateOptions::default());

    repair_fields(&mut dataset);
    if let Ok(bytes) = to_coco_vec(&dataset) {
        let again = from_coco_slice(&bytes).expect("re-encoded dataset decodes");
        assert_eq!(again, dataset);
    }
});
