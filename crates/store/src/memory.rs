//! In-memory implementation of the storage contracts.
//!
//! A single `RwLock` guards the collections, so every mutation observes and
//! updates the uniqueness index under one exclusive guard; two concurrent
//! creates for the same (user, book) pair cannot both pass the index check.
//! Reads take the shared side and never block each other.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{
    Book, BookId, BookQuery, NewBook, NewReview, Page, Review, ReviewId, ReviewPatch, UserId,
    UserProfile,
};
use crate::{BookStore, ReviewStore, UserDirectory};

const DEFAULT_COVER: &str = "default-book.jpg";

#[derive(Default)]
struct Collections {
    books: HashMap<BookId, Book>,
    // Insertion order (oldest first); listings walk it in reverse so that
    // equal-timestamp records still come back newest-first.
    book_order: Vec<BookId>,
    reviews: HashMap<ReviewId, Review>,
    review_order: Vec<ReviewId>,
    // Uniqueness index for the one-review-per-(user, book) invariant.
    review_owners: HashMap<(UserId, BookId), ReviewId>,
    profiles: HashMap<UserId, UserProfile>,
}

/// In-memory durable collections behind a read-write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn add_book(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut inner = self.inner.write().await;

        let record = Book {
            id: BookId::new(),
            title: book.title,
            author: book.author,
            description: book.description,
            cover_image: book.cover_image.unwrap_or_else(|| DEFAULT_COVER.to_string()),
            genre: book.genre,
            publication_date: book.publication_date,
            average_rating: 0.0,
            created_at: OffsetDateTime::now_utc(),
        };

        inner.book_order.push(record.id);
        inner.books.insert(record.id, record.clone());

        tracing::debug!(book_id = %record.id, title = %record.title, "book added");
        Ok(record)
    }

    async fn get_book(&self, id: BookId) -> Result<Book, StoreError> {
        let inner = self.inner.read().await;
        inner
            .books
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("book"))
    }

    async fn list_books(
        &self,
        query: BookQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Book>, StoreError> {
        let inner = self.inner.read().await;

        let search = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<Book> = inner
            .book_order
            .iter()
            .rev()
            .filter_map(|id| inner.books.get(id))
            .filter(|book| match query.genre.as_deref() {
                Some(genre) => book.genre == genre,
                None => true,
            })
            .filter(|book| match search.as_deref() {
                Some(needle) => {
                    book.title.to_lowercase().contains(needle)
                        || book.author.to_lowercase().contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect();

        Ok(Page::paginate(matching, page, page_size))
    }

    async fn set_average_rating(&self, id: BookId, average: f64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let book = inner.books.get_mut(&id).ok_or(StoreError::NotFound("book"))?;
        book.average_rating = average;
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut inner = self.inner.write().await;

        let key = (review.user_id, review.book_id);
        if inner.review_owners.contains_key(&key) {
            return Err(StoreError::DuplicateReview);
        }

        let now = OffsetDateTime::now_utc();
        let record = Review {
            id: ReviewId::new(),
            user_id: review.user_id,
            book_id: review.book_id,
            rating: review.rating,
            title: review.title,
            review_text: review.review_text,
            created_at: now,
            updated_at: now,
        };

        inner.review_owners.insert(key, record.id);
        inner.review_order.push(record.id);
        inner.reviews.insert(record.id, record.clone());

        tracing::debug!(
            review_id = %record.id,
            book_id = %record.book_id,
            user_id = %record.user_id,
            "review inserted"
        );
        Ok(record)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Review, StoreError> {
        let inner = self.inner.read().await;
        inner
            .reviews
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("review"))
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, StoreError> {
        let mut inner = self.inner.write().await;
        let review = inner
            .reviews
            .get_mut(&id)
            .ok_or(StoreError::NotFound("review"))?;

        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        if let Some(title) = patch.title {
            review.title = title;
        }
        if let Some(review_text) = patch.review_text {
            review.review_text = review_text;
        }
        review.updated_at = OffsetDateTime::now_utc();

        Ok(review.clone())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<Review, StoreError> {
        let mut inner = self.inner.write().await;

        let record = inner
            .reviews
            .remove(&id)
            .ok_or(StoreError::NotFound("review"))?;
        inner
            .review_owners
            .remove(&(record.user_id, record.book_id));
        inner.review_order.retain(|existing| *existing != id);

        tracing::debug!(review_id = %record.id, book_id = %record.book_id, "review removed");
        Ok(record)
    }

    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .filter(|review| review.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn list_reviews(
        &self,
        book_id: Option<BookId>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Review>, StoreError> {
        let inner = self.inner.read().await;

        let matching: Vec<Review> = inner
            .review_order
            .iter()
            .rev()
            .filter_map(|id| inner.reviews.get(id))
            .filter(|review| match book_id {
                Some(book_id) => review.book_id == book_id,
                None => true,
            })
            .cloned()
            .collect();

        Ok(Page::paginate(matching, page, page_size))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::macros::date;
    use uuid::Uuid;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            description: "A classic.".to_string(),
            cover_image: None,
            genre: "fantasy".to_string(),
            publication_date: date!(1968 - 03 - 01),
        }
    }

    fn new_review(user_id: UserId, book_id: BookId, rating: u8) -> NewReview {
        NewReview {
            user_id,
            book_id,
            rating,
            title: "Loved it".to_string(),
            review_text: "Read it twice.".to_string(),
        }
    }

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    #[tokio::test]
    async fn add_book_starts_unrated_with_default_cover() {
        let store = MemoryStore::new();
        let book = store.add_book(new_book("A Wizard of Earthsea")).await.unwrap();

        assert_eq!(book.average_rating, 0.0);
        assert_eq!(book.cover_image, DEFAULT_COVER);

        let fetched = store.get_book(book.id).await.unwrap();
        assert_eq!(fetched.title, "A Wizard of Earthsea");
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_book(BookId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("book")));
    }

    #[tokio::test]
    async fn duplicate_review_is_rejected() {
        let store = MemoryStore::new();
        let book = store.add_book(new_book("Dune")).await.unwrap();
        let reader = user();

        store
            .insert_review(new_review(reader, book.id, 5))
            .await
            .unwrap();
        let err = store
            .insert_review(new_review(reader, book.id, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateReview));
    }

    #[tokio::test]
    async fn concurrent_creates_for_same_pair_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let book = store.add_book(new_book("Dune")).await.unwrap();
        let reader = user();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let review = new_review(reader, book.id, 4);
            handles.push(tokio::spawn(async move {
                store.insert_review(review).await
            }));
        }

        let mut winners = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(StoreError::DuplicateReview) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.reviews_for_book(book.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_frees_the_pair_for_a_new_review() {
        let store = MemoryStore::new();
        let book = store.add_book(new_book("Dune")).await.unwrap();
        let reader = user();

        let first = store
            .insert_review(new_review(reader, book.id, 2))
            .await
            .unwrap();
        store.delete_review(first.id).await.unwrap();

        // NoReview state again, so create is legal.
        store
            .insert_review(new_review(reader, book.id, 5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_reviews_is_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let first = store.add_book(new_book("Dune")).await.unwrap();
        let second = store.add_book(new_book("Hyperion")).await.unwrap();

        let a = store
            .insert_review(new_review(user(), first.id, 3))
            .await
            .unwrap();
        let b = store
            .insert_review(new_review(user(), first.id, 4))
            .await
            .unwrap();
        store
            .insert_review(new_review(user(), second.id, 5))
            .await
            .unwrap();

        let page = store.list_reviews(Some(first.id), 1, 10).await.unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(
            page.items.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );

        let all = store.list_reviews(None, 1, 10).await.unwrap();
        assert_eq!(all.items.len(), 3);
    }

    #[tokio::test]
    async fn update_patches_only_provided_fields() {
        let store = MemoryStore::new();
        let book = store.add_book(new_book("Dune")).await.unwrap();
        let review = store
            .insert_review(new_review(user(), book.id, 3))
            .await
            .unwrap();

        let updated = store
            .update_review(
                review.id,
                ReviewPatch {
                    rating: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.rating, 5);
        assert_eq!(updated.title, review.title);
        assert_eq!(updated.review_text, review.review_text);
        assert!(updated.updated_at >= review.updated_at);
    }

    #[tokio::test]
    async fn list_books_filters_genre_and_search() {
        let store = MemoryStore::new();
        store.add_book(new_book("A Wizard of Earthsea")).await.unwrap();
        let mut other = new_book("Neuromancer");
        other.genre = "cyberpunk".to_string();
        other.author = "William Gibson".to_string();
        store.add_book(other).await.unwrap();

        let fantasy = store
            .list_books(
                BookQuery {
                    genre: Some("fantasy".to_string()),
                    search: None,
                },
                1,
                10,
            )
            .await
            .unwrap();
        assert_eq!(fantasy.items.len(), 1);
        assert_eq!(fantasy.items[0].title, "A Wizard of Earthsea");

        let by_author = store
            .list_books(
                BookQuery {
                    genre: None,
                    search: Some("gibson".to_string()),
                },
                1,
                10,
            )
            .await
            .unwrap();
        assert_eq!(by_author.items.len(), 1);
        assert_eq!(by_author.items[0].title, "Neuromancer");
    }

    #[tokio::test]
    async fn profiles_round_trip_through_the_directory() {
        let store = MemoryStore::new();
        let reader = user();

        assert!(store.get_profile(reader).await.unwrap().is_none());

        store
            .upsert_profile(UserProfile {
                user_id: reader,
                username: "margaret".to_string(),
                avatar: "margaret.png".to_string(),
            })
            .await
            .unwrap();

        let profile = store.get_profile(reader).await.unwrap().unwrap();
        assert_eq!(profile.username, "margaret");
    }
}
