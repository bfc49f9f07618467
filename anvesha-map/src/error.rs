//! Error types for the map layer.

use thiserror::Error;

/// Map-layer error type.
///
/// Nothing in the exploration core is process-fatal; this surfaces only at
/// genuine misuse seams such as merging matrices of different worlds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("matrix dimension mismatch: ours {ours:?}, theirs {theirs:?}")]
    DimensionMismatch {
        ours: (i32, i32),
        theirs: (i32, i32),
    },
}
