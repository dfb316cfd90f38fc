//! Default-filling passes for annotation fields that COCO tooling expects.
//!
//! A field counts as missing only when the key is absent. Present values are
//! never touched, including `iscrowd: 0` and an explicit `null`, which makes
//! every pass idempotent.

use serde::Serialize;
use serde_json::Value;

use crate::dataset::Dataset;

/// Default written for a missing `iscrowd`.
pub const DEFAULT_ISCROWD: u8 = 0;

/// Number of fields filled in by [`repair_fields`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub iscrowd_added: usize,
    pub segmentation_added: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.iscrowd_added + self.segmentation_added
    }
}

/// Sets `iscrowd: 0` on annotations without one; returns how many changed.
pub fn repair_iscrowd(dataset: &mut Dataset) -> usize {
    let mut added = 0;
    for ann in dataset.annotations.iter_mut().filter(|a| !a.has_iscrowd()) {
        ann.iscrowd = Some(DEFAULT_ISCROWD);
        added += 1;
    }
    added
}

/// Sets `segmentation: []` on annotations without one; returns how many
/// changed.
pub fn repair_segmentation(dataset: &mut Dataset) -> usize {
    let mut added = 0;
    for ann in dataset
        .annotations
        .iter_mut()
        .filter(|a| !a.has_segmentation())
    {
        ann.segmentation = Some(Value::Array(Vec::new()));
        added += 1;
    }
    added
}

/// Runs both repair passes.
pub fn repair_fields(dataset: &mut Dataset) -> RepairReport {
    RepairReport {
        iscrowd_added: repair_iscrowd(dataset),
        segmentation_added: repair_segmentation(dataset),
    }
}
