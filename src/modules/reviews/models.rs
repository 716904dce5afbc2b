use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use shelfmark_store::{BookId, Review, ReviewId, UserId, UserProfile};

/// Query parameters for the review listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub book_id: Option<BookId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request body for creating a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewBody {
    pub book_id: BookId,
    pub rating: u8,
    pub title: String,
    pub review_text: String,
}

/// Request body for a partial review update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewBody {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub review_text: Option<String>,
}

/// Review owner display attributes resolved from the user directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDisplay {
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
}

impl OwnerDisplay {
    /// Resolve display attributes, falling back to a placeholder for users
    /// who never stored a profile.
    pub fn resolve(user_id: UserId, profile: Option<UserProfile>) -> Self {
        match profile {
            Some(profile) => Self {
                user_id,
                username: profile.username,
                avatar: profile.avatar,
            },
            None => Self {
                user_id,
                username: format!("reader-{}", &user_id.0.simple().to_string()[..8]),
                avatar: "default-avatar.png".to_string(),
            },
        }
    }
}

/// A review with its owner's display attributes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub book_id: BookId,
    pub rating: u8,
    pub title: String,
    pub review_text: String,
    pub user: OwnerDisplay,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ReviewView {
    pub fn new(review: Review, profile: Option<UserProfile>) -> Self {
        Self {
            id: review.id,
            book_id: review.book_id,
            rating: review.rating,
            title: review.title,
            review_text: review.review_text,
            user: OwnerDisplay::resolve(review.user_id, profile),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

/// Response envelope for the review listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewView>,
    pub total_pages: u32,
    pub current_page: u32,
}

/// Confirmation returned by the delete endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteConfirmation {
    pub message: &'static str,
}

impl DeleteConfirmation {
    pub fn removed() -> Self {
        Self {
            message: "Review removed",
        }
    }
}
