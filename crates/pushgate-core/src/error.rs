//! Error types for the fixed-capacity containers.

use thiserror::Error;

/// A fixed-capacity container refused an insertion.
///
/// The container is left exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{what} is full (capacity {capacity})")]
pub struct CapacityExceeded {
    /// Which container refused the entry.
    pub what: &'static str,
    /// The container's fixed capacity.
    pub capacity: usize,
}

/// Errors from writing into a [`LabelSet`](crate::LabelSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LabelError {
    /// The index is at or beyond the table's capacity.
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),

    /// The index would leave a hole after the occupied prefix.
    #[error("label index {index} leaves a gap after {len} occupied slots")]
    NonContiguous { index: usize, len: usize },

    /// Label keys must be non-empty.
    #[error("label key must not be empty")]
    EmptyKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_display() {
        let err = CapacityExceeded {
            what: "metric registry",
            capacity: 5,
        };
        assert_eq!(err.to_string(), "metric registry is full (capacity 5)");
    }

    #[test]
    fn label_error_wraps_capacity() {
        let err: LabelError = CapacityExceeded {
            what: "label set",
            capacity: 2,
        }
        .into();
        assert_eq!(err.to_string(), "label set is full (capacity 2)");
    }

    #[test]
    fn non_contiguous_display() {
        let err = LabelError::NonContiguous { index: 3, len: 1 };
        assert_eq!(
            err.to_string(),
            "label index 3 leaves a gap after 1 occupied slots"
        );
    }
}
