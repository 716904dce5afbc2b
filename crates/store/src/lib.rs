//! Durable keyed collections backing Shelfmark.
//!
//! The traits here are the storage contracts consumed by the review service
//! and the HTTP modules. The in-memory implementation in [`memory`] enforces
//! the (user, book) uniqueness invariant atomically inside its write lock,
//! so concurrent create attempts for the same pair cannot both succeed.

pub mod error;
pub mod memory;
pub mod model;

use async_trait::async_trait;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use model::{
    Book, BookId, BookQuery, NewBook, NewReview, Page, Review, ReviewId, ReviewPatch, UserId,
    UserProfile,
};

/// Book aggregate store. `set_average_rating` is reserved for the rating
/// aggregator; nothing else writes the derived field.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new book with `average_rating` 0.0.
    async fn add_book(&self, book: NewBook) -> Result<Book, StoreError>;

    async fn get_book(&self, id: BookId) -> Result<Book, StoreError>;

    /// Newest-first page of books matching the query.
    async fn list_books(
        &self,
        query: BookQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Book>, StoreError>;

    /// Write the derived average. Aggregator use only.
    async fn set_average_rating(&self, id: BookId, average: f64) -> Result<(), StoreError>;
}

/// Review store. Insertion must enforce the one-review-per-(user, book)
/// invariant atomically, not by a separate existence check.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review; fails with [`StoreError::DuplicateReview`] if the
    /// user already reviewed the book.
    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError>;

    async fn get_review(&self, id: ReviewId) -> Result<Review, StoreError>;

    /// Apply a partial update, refreshing `updated_at`.
    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, StoreError>;

    /// Remove a review, returning the removed record.
    async fn delete_review(&self, id: ReviewId) -> Result<Review, StoreError>;

    /// Every current review for a book, for aggregate recomputation.
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>, StoreError>;

    /// Newest-first page of reviews, optionally scoped to one book.
    async fn list_reviews(
        &self,
        book_id: Option<BookId>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Review>, StoreError>;
}

/// Display-attribute directory for review owners.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError>;
}
