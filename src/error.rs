use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::CategoryId;
use crate::validation::ValidationReport;

/// The main error type for coco-doctor operations.
#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed COCO JSON: {0}")]
    CocoJsonDecode(#[source] serde_json::Error),

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode COCO JSON: {0}")]
    CocoJsonEncode(#[source] serde_json::Error),

    #[error("Failed to encode report as JSON: {0}")]
    ReportEncode(#[source] serde_json::Error),

    #[error("Duplicate {kind} id {id}")]
    Integrity { kind: RecordKind, id: u64 },

    #[error("No {kind} with id {id}")]
    NotFound { kind: RecordKind, id: u64 },

    #[error("Category mapping rejected: {0}")]
    PolicyConflict(#[from] PolicyConflict),

    #[error("Reassigning {kind} ids would overflow u64")]
    IdOverflow { kind: RecordKind },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),
}

impl DoctorError {
    /// True for errors caused by structurally invalid serialized input.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DoctorError::CocoJsonParse { .. } | DoctorError::CocoJsonDecode(_)
        )
    }

    pub(crate) fn not_found(kind: RecordKind, id: u64) -> Self {
        DoctorError::NotFound { kind, id }
    }
}

/// The three record collections of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Image,
    Category,
    Annotation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Image => "image",
            RecordKind::Category => "category",
            RecordKind::Annotation => "annotation",
        };
        f.write_str(name)
    }
}

/// A rule violated by a proposed category id assignment.
///
/// Returned before anything is applied; the caller corrects the mapping and
/// resubmits it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolicyConflict {
    #[error("new id {id} is assigned to both category {first} and category {second}")]
    DuplicateTargetId {
        id: CategoryId,
        first: CategoryId,
        second: CategoryId,
    },

    #[error("new id {id} for category {source_id} conflicts with existing category id {id}")]
    CollidesWithExisting { source_id: CategoryId, id: CategoryId },

    #[error("category {source_id} does not exist in the dataset being mapped")]
    UnknownSourceCategory { source_id: CategoryId },
}
