//! Review service: authorization, CRUD orchestration, and the
//! mutate-then-recompute sequence that keeps every book's average rating
//! consistent with its review set.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shelfmark_kernel::settings::PaginationSettings;
use shelfmark_store::{
    BookId, BookStore, NewReview, Review, ReviewId, ReviewPatch, ReviewStore, StoreError, UserId,
    UserDirectory,
};

use super::aggregate;
use super::models::{ReviewListResponse, ReviewView};

/// Authenticated caller as seen by the service: identity plus the admin
/// capability. Supplied by the identity provider at the HTTP boundary.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Orchestrates review mutations.
///
/// Every mutation runs under the owning book's lock: mutate the review set,
/// recompute the average, write it. Two concurrent mutations against the
/// same book therefore cannot publish an average derived from a stale
/// snapshot. Reads never take a book lock and may observe a transiently
/// stale average.
pub struct ReviewService {
    books: Arc<dyn BookStore>,
    reviews: Arc<dyn ReviewStore>,
    users: Arc<dyn UserDirectory>,
    pagination: PaginationSettings,
    book_locks: Mutex<HashMap<BookId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ReviewService {
    pub fn new(
        books: Arc<dyn BookStore>,
        reviews: Arc<dyn ReviewStore>,
        users: Arc<dyn UserDirectory>,
        pagination: PaginationSettings,
    ) -> Self {
        Self {
            books,
            reviews,
            users,
            pagination,
            book_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Newest-first page of reviews, optionally scoped to one book, with
    /// owner display attributes resolved. Out-of-range pages come back
    /// empty, never as an error.
    pub async fn list(
        &self,
        book_id: Option<BookId>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ReviewListResponse, StoreError> {
        let (page, page_size) = self.normalize_page(page, limit);
        let listed = self.reviews.list_reviews(book_id, page, page_size).await?;

        let mut reviews = Vec::with_capacity(listed.items.len());
        for review in listed.items {
            reviews.push(self.into_view(review).await?);
        }

        Ok(ReviewListResponse {
            reviews,
            total_pages: listed.total_pages,
            current_page: listed.current_page,
        })
    }

    /// Create a review for a book the caller has not yet reviewed.
    ///
    /// Validation and the book-existence check run before any mutation. The
    /// store rejects a duplicate (user, book) pair atomically, so two
    /// concurrent creates yield exactly one success.
    pub async fn create(
        &self,
        caller: Caller,
        book_id: BookId,
        rating: u8,
        title: &str,
        review_text: &str,
    ) -> Result<ReviewView, StoreError> {
        validate_rating(rating)?;
        let title = validate_text("title", title)?;
        let review_text = validate_text("reviewText", review_text)?;

        self.books.get_book(book_id).await?;

        let lock = self.book_lock(book_id);
        let _guard = lock.lock().await;

        let review = self
            .reviews
            .insert_review(NewReview {
                user_id: caller.user_id,
                book_id,
                rating,
                title,
                review_text,
            })
            .await?;

        aggregate::recompute(self.books.as_ref(), self.reviews.as_ref(), book_id).await?;

        tracing::info!(review_id = %review.id, book_id = %book_id, "review created");
        self.into_view(review).await
    }

    /// Apply a partial update to the caller's own review.
    ///
    /// Update is owner-only; the admin capability deliberately does not
    /// apply here (admins may delete any review but edit none but their
    /// own). The average is recomputed unconditionally after the write,
    /// which is idempotent when the rating did not change.
    pub async fn update(
        &self,
        caller: Caller,
        review_id: ReviewId,
        patch: ReviewPatch,
    ) -> Result<ReviewView, StoreError> {
        let existing = self.reviews.get_review(review_id).await?;

        if existing.user_id != caller.user_id {
            return Err(StoreError::Forbidden("only the review owner may update it"));
        }

        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
        }
        let patch = ReviewPatch {
            rating: patch.rating,
            title: patch
                .title
                .as_deref()
                .map(|title| validate_text("title", title))
                .transpose()?,
            review_text: patch
                .review_text
                .as_deref()
                .map(|text| validate_text("reviewText", text))
                .transpose()?,
        };

        let lock = self.book_lock(existing.book_id);
        let _guard = lock.lock().await;

        let updated = self.reviews.update_review(review_id, patch).await?;
        aggregate::recompute(self.books.as_ref(), self.reviews.as_ref(), existing.book_id).await?;

        tracing::info!(review_id = %review_id, book_id = %existing.book_id, "review updated");
        self.into_view(updated).await
    }

    /// Delete a review as its owner or as an admin.
    pub async fn delete(&self, caller: Caller, review_id: ReviewId) -> Result<(), StoreError> {
        let existing = self.reviews.get_review(review_id).await?;

        if existing.user_id != caller.user_id && !caller.is_admin {
            return Err(StoreError::Forbidden(
                "only the review owner or an admin may delete it",
            ));
        }

        let lock = self.book_lock(existing.book_id);
        let _guard = lock.lock().await;

        let removed = self.reviews.delete_review(review_id).await?;
        aggregate::recompute(self.books.as_ref(), self.reviews.as_ref(), removed.book_id).await?;

        tracing::info!(review_id = %review_id, book_id = %removed.book_id, "review deleted");
        Ok(())
    }

    fn normalize_page(&self, page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
        let page = page.filter(|page| *page >= 1).unwrap_or(1);
        let page_size = limit
            .filter(|limit| *limit >= 1)
            .unwrap_or(self.pagination.default_page_size)
            .min(self.pagination.max_page_size);
        (page, page_size)
    }

    /// Per-book mutation lock, created on first use.
    fn book_lock(&self, book_id: BookId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.book_locks.lock().expect("book lock registry poisoned");
        locks.entry(book_id).or_default().clone()
    }

    async fn into_view(&self, review: Review) -> Result<ReviewView, StoreError> {
        let profile = self.users.get_profile(review.user_id).await?;
        Ok(ReviewView::new(review, profile))
    }
}

fn validate_rating(rating: u8) -> Result<(), StoreError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::validation(
            "rating must be an integer between 1 and 5",
        ))
    }
}

fn validate_text(field: &str, value: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StoreError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_store::{MemoryStore, NewBook, UserProfile};
    use time::macros::date;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReviewService,
        book_id: BookId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = ReviewService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            PaginationSettings::default(),
        );

        let book_id = store
            .add_book(NewBook {
                title: "The Left Hand of Darkness".to_string(),
                author: "Ursula K. Le Guin".to_string(),
                description: "Winter planet politics.".to_string(),
                cover_image: None,
                genre: "science fiction".to_string(),
                publication_date: date!(1969 - 03 - 01),
            })
            .await
            .unwrap()
            .id;

        Fixture {
            store,
            service,
            book_id,
        }
    }

    fn reader() -> Caller {
        Caller {
            user_id: UserId(Uuid::new_v4()),
            is_admin: false,
        }
    }

    fn admin() -> Caller {
        Caller {
            user_id: UserId(Uuid::new_v4()),
            is_admin: true,
        }
    }

    async fn average(fx: &Fixture) -> f64 {
        fx.store.get_book(fx.book_id).await.unwrap().average_rating
    }

    #[tokio::test]
    async fn average_tracks_create_update_delete() {
        let fx = fixture().await;
        let user_a = reader();
        let user_b = reader();

        assert_eq!(average(&fx).await, 0.0);

        let review_a = fx
            .service
            .create(user_a, fx.book_id, 4, "Striking", "Left me thinking.")
            .await
            .unwrap();
        assert_eq!(average(&fx).await, 4.0);

        let review_b = fx
            .service
            .create(user_b, fx.book_id, 2, "Not for me", "Too slow.")
            .await
            .unwrap();
        assert_eq!(average(&fx).await, 3.0);

        fx.service
            .update(
                user_a,
                review_a.id,
                ReviewPatch {
                    rating: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(average(&fx).await, 3.5);

        fx.service.delete(user_b, review_b.id).await.unwrap();
        assert_eq!(average(&fx).await, 5.0);

        fx.service.delete(user_a, review_a.id).await.unwrap();
        assert_eq!(average(&fx).await, 0.0);
    }

    #[tokio::test]
    async fn duplicate_create_leaves_state_untouched() {
        let fx = fixture().await;
        let user = reader();

        fx.service
            .create(user, fx.book_id, 4, "Great", "Really great.")
            .await
            .unwrap();

        let err = fx
            .service
            .create(user, fx.book_id, 1, "Changed my mind", "Actually bad.")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReview));

        // Existing review and derived average are unchanged.
        assert_eq!(average(&fx).await, 4.0);
        let listed = fx.service.list(Some(fx.book_id), None, None).await.unwrap();
        assert_eq!(listed.reviews.len(), 1);
        assert_eq!(listed.reviews[0].rating, 4);
    }

    #[tokio::test]
    async fn create_validates_before_mutating() {
        let fx = fixture().await;

        let err = fx
            .service
            .create(reader(), fx.book_id, 0, "Title", "Text")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = fx
            .service
            .create(reader(), fx.book_id, 6, "Title", "Text")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = fx
            .service
            .create(reader(), fx.book_id, 3, "   ", "Text")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = fx
            .service
            .create(reader(), fx.book_id, 3, "Title", "")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let listed = fx.service.list(Some(fx.book_id), None, None).await.unwrap();
        assert!(listed.reviews.is_empty());
        assert_eq!(average(&fx).await, 0.0);
    }

    #[tokio::test]
    async fn create_for_missing_book_is_not_found() {
        let fx = fixture().await;

        let err = fx
            .service
            .create(reader(), BookId::new(), 3, "Title", "Text")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("book")));
    }

    #[tokio::test]
    async fn update_is_owner_only_even_for_admins() {
        let fx = fixture().await;
        let owner = reader();

        let review = fx
            .service
            .create(owner, fx.book_id, 3, "Fine", "It was fine.")
            .await
            .unwrap();

        let err = fx
            .service
            .update(
                reader(),
                review.id,
                ReviewPatch {
                    rating: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        // Admin capability grants delete rights, not update rights.
        let err = fx
            .service
            .update(
                admin(),
                review.id,
                ReviewPatch {
                    rating: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        assert_eq!(average(&fx).await, 3.0);
    }

    #[tokio::test]
    async fn update_keeps_unset_fields() {
        let fx = fixture().await;
        let owner = reader();

        let review = fx
            .service
            .create(owner, fx.book_id, 3, "Fine", "It was fine.")
            .await
            .unwrap();

        let updated = fx
            .service
            .update(
                owner,
                review.id,
                ReviewPatch {
                    title: Some("Better on reread".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Better on reread");
        assert_eq!(updated.rating, 3);
        assert_eq!(updated.review_text, "It was fine.");
    }

    #[tokio::test]
    async fn delete_authorization_matrix() {
        let fx = fixture().await;
        let owner = reader();

        let review = fx
            .service
            .create(owner, fx.book_id, 4, "Good", "Good stuff.")
            .await
            .unwrap();

        // Non-owner non-admin: forbidden.
        let err = fx.service.delete(reader(), review.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        // Non-owner admin: allowed.
        fx.service.delete(admin(), review.id).await.unwrap();
        assert_eq!(average(&fx).await, 0.0);

        // Owner deleting their own review: allowed.
        let review = fx
            .service
            .create(owner, fx.book_id, 5, "Again", "Re-reviewed.")
            .await
            .unwrap();
        fx.service.delete(owner, review.id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_review_is_not_found() {
        let fx = fixture().await;

        let err = fx
            .service
            .update(reader(), ReviewId::new(), ReviewPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("review")));

        let err = fx.service.delete(reader(), ReviewId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("review")));
    }

    #[tokio::test]
    async fn list_resolves_owner_display() {
        let fx = fixture().await;
        let owner = reader();

        fx.store
            .upsert_profile(UserProfile {
                user_id: owner.user_id,
                username: "octavia".to_string(),
                avatar: "octavia.png".to_string(),
            })
            .await
            .unwrap();

        fx.service
            .create(owner, fx.book_id, 5, "Superb", "Loved every page.")
            .await
            .unwrap();
        fx.service
            .create(reader(), fx.book_id, 3, "Okay", "Decent read.")
            .await
            .unwrap();

        let listed = fx.service.list(Some(fx.book_id), None, None).await.unwrap();
        assert_eq!(listed.reviews.len(), 2);

        // Newest first: the anonymous reader's review leads.
        assert!(listed.reviews[0].user.username.starts_with("reader-"));
        assert_eq!(listed.reviews[1].user.username, "octavia");
    }

    #[tokio::test]
    async fn out_of_range_page_is_empty_with_real_totals() {
        let fx = fixture().await;

        fx.service
            .create(reader(), fx.book_id, 4, "Good", "Good stuff.")
            .await
            .unwrap();

        let listed = fx
            .service
            .list(Some(fx.book_id), Some(3), None)
            .await
            .unwrap();
        assert!(listed.reviews.is_empty());
        assert_eq!(listed.total_pages, 1);
        assert_eq!(listed.current_page, 3);
    }

    #[tokio::test]
    async fn concurrent_creates_keep_average_consistent() {
        let Fixture {
            store,
            service,
            book_id,
        } = fixture().await;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for rating in [1u8, 2, 3, 4, 5] {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create(reader(), book_id, rating, "Rated", "Rated it.")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Whatever the interleaving, the published average reflects the
        // full final review set.
        assert_eq!(store.get_book(book_id).await.unwrap().average_rating, 3.0);
    }
}
