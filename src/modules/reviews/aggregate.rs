//! Rating aggregation.
//!
//! The average is always derived fresh from the book's current review set
//! rather than adjusted incrementally from a running total, so a re-run
//! after a crash between the review mutation and the average write can
//! never produce a drifted value. This trades an O(n) scan per mutation for
//! a failure-recovery story that needs no reconciliation.

use shelfmark_store::{BookId, BookStore, ReviewStore, StoreError};

/// Recompute a book's `average_rating` from its current reviews and write
/// it to the book record. Returns the written average.
///
/// Idempotent: with no intervening review change, a second call writes the
/// same value. Storage failures surface as [`StoreError::Aggregation`]; the
/// caller may safely retry.
pub async fn recompute(
    books: &dyn BookStore,
    reviews: &dyn ReviewStore,
    book_id: BookId,
) -> Result<f64, StoreError> {
    let current = reviews
        .reviews_for_book(book_id)
        .await
        .map_err(|err| StoreError::Aggregation(err.to_string()))?;

    let average = mean_rating(&current);

    books
        .set_average_rating(book_id, average)
        .await
        .map_err(|err| StoreError::Aggregation(err.to_string()))?;

    tracing::debug!(book_id = %book_id, average, reviews = current.len(), "average recomputed");
    Ok(average)
}

/// Arithmetic mean of ratings in double precision; 0.0 for an empty set.
fn mean_rating(reviews: &[shelfmark_store::Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }

    let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    f64::from(total) / reviews.len() as f64
}
