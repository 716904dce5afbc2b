use thiserror::Error;

/// Domain error taxonomy shared by the stores and the review service.
///
/// `Validation` and `Forbidden` are always raised before any mutation, so a
/// failed call leaves all collections untouched. `Aggregation` marks a
/// failure between a review mutation and the average-rating write; callers
/// may retry, recomputation is idempotent.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("book already reviewed by this user")]
    DuplicateReview,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("rating aggregation failed: {0}")]
    Aggregation(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
