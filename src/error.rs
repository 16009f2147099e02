//! Error types for index operations.

/// Errors that can occur during index operations.
///
/// Every error is reported before any state changes, so a failed operation
/// leaves the index exactly as it was.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The plane dimensions must be positive.
    #[error("plane dimensions must be positive, got {width}x{height}")]
    InvalidDimensions {
        /// Plane width.
        width: i64,
        /// Plane height.
        height: i64,
    },

    /// The grid shape is non-positive or too fine for the plane.
    #[error("invalid grid shape: {rows} rows x {cols} columns")]
    InvalidShape {
        /// Requested row count.
        rows: i64,
        /// Requested column count.
        cols: i64,
    },

    /// A position resolves to a cell outside the allocated grid.
    #[error("position ({x}, {y}) is outside the indexed plane")]
    OutOfBounds {
        /// X coordinate of the rejected position.
        x: i64,
        /// Y coordinate of the rejected position.
        y: i64,
    },

    /// The item is already present in the index.
    #[error("item is already present in the index")]
    DuplicateItem,

    /// The operation requires an item that is not present.
    #[error("item is not present in the index")]
    NotFound,
}

/// A violated internal invariant, reported by [`SpatialIndex::check_consistency`].
///
/// Unlike [`Error`], this does not indicate caller misuse: it means the
/// index's two internal structures disagree, which is a defect in the index
/// itself. The gated self-check panics with this message.
///
/// [`SpatialIndex::check_consistency`]: crate::SpatialIndex::check_consistency
#[derive(Debug, thiserror::Error)]
#[error("index consistency violated: {detail}")]
pub struct ConsistencyError {
    detail: &'static str,
}

impl ConsistencyError {
    pub(crate) const fn new(detail: &'static str) -> Self {
        Self { detail }
    }
}
