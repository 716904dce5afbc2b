use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Unique identifier for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable user identifier supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A book record. `average_rating` is derived from the book's current
/// review set and is only ever written by the rating aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: String,
    pub genre: String,
    pub publication_date: Date,
    pub average_rating: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Attributes for the admin-only add-book operation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub genre: String,
    pub publication_date: Date,
}

/// A review record. At most one review exists per (user, book) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: u8,
    pub title: String,
    pub review_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Attributes for inserting a review. Validation happens in the review
/// service before this reaches a store.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: u8,
    pub title: String,
    pub review_text: String,
}

/// Partial update for a review; `None` fields retain prior values.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub review_text: Option<String>,
}

/// Display attributes attached to review responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
}

/// Filter for book listings: genre equality and case-insensitive
/// substring match on title or author.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub genre: Option<String>,
    pub search: Option<String>,
}

/// One page of a listing, newest-first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub current_page: u32,
}

impl<T> Page<T> {
    /// Slice `items` (already newest-first) into the requested page.
    ///
    /// Out-of-range pages yield an empty page with the real `total_pages`,
    /// never an error.
    pub fn paginate(items: Vec<T>, page: u32, page_size: u32) -> Self {
        let total = items.len() as u32;
        let total_pages = total.div_ceil(page_size.max(1));
        let skip = (page.max(1) - 1).saturating_mul(page_size) as usize;

        let items = items
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();

        Self {
            items,
            total_pages,
            current_page: page,
        }
    }
}
