//! Merge report: what was imported and what was left behind.

use serde::Serialize;
use std::fmt;

use crate::reconcile::{DropReason, IdPlan};

/// Counts produced by one merge.
///
/// Every source annotation is either imported or counted in `dropped`, and
/// every source image is either imported or counted in
/// `images_skipped_unannotated`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Category policy used ("strict" or "mapped").
    pub policy: String,
    /// Record counts of the incoming dataset.
    pub source: MergeCounts,
    pub images_imported: usize,
    /// Source images with no imported annotation that were left out.
    pub images_skipped_unannotated: usize,
    pub annotations_imported: usize,
    pub dropped: DroppedAnnotations,
    pub categories_created: usize,
}

impl MergeReport {
    /// Total number of source annotations not imported.
    pub fn annotations_dropped(&self) -> usize {
        self.dropped.total()
    }

    /// True when nothing from the source was lost.
    pub fn is_lossless(&self) -> bool {
        self.annotations_dropped() == 0 && self.images_skipped_unannotated == 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Merge ({} category policy)", self.policy)?;
        writeln!(
            f,
            "  source: {} images, {} categories, {} annotations",
            self.source.images, self.source.categories, self.source.annotations
        )?;
        writeln!(
            f,
            "  imported: {} images, {} annotations, {} new categories",
            self.images_imported, self.annotations_imported, self.categories_created
        )?;

        if self.annotations_dropped() > 0 {
            writeln!(f)?;
            writeln!(f, "Dropped annotations ({}):", self.annotations_dropped())?;
            for (label, count) in [
                ("category not in target", self.dropped.category_not_in_target),
                ("unresolved category mapping", self.dropped.unresolved_mapping),
                ("image missing from source", self.dropped.missing_image),
            ] {
                if count > 0 {
                    writeln!(f, "  - {}: {}", label, count)?;
                }
            }
        }

        if self.images_skipped_unannotated > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "Skipped {} source image(s) with no imported annotation",
                self.images_skipped_unannotated
            )?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounts {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
}

/// Dropped annotation counts, by reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DroppedAnnotations {
    pub category_not_in_target: usize,
    pub unresolved_mapping: usize,
    pub missing_image: usize,
}

impl DroppedAnnotations {
    pub(crate) fn from_plan(plan: &IdPlan) -> Self {
        Self {
            category_not_in_target: plan.excluded_count(DropReason::CategoryNotInTarget),
            unresolved_mapping: plan.excluded_count(DropReason::UnresolvedMapping),
            missing_image: plan.excluded_count(DropReason::MissingImage),
        }
    }

    pub fn total(&self) -> usize {
        self.category_not_in_target + self.unresolved_mapping + self.missing_image
    }
}
