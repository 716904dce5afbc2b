use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use shelfmark_store::{Book, BookId};

/// Query parameters for the book listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksQuery {
    pub genre: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request body for the admin-only add-book operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookBody {
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub genre: String,
    pub publication_date: Date,
}

/// Book as exposed over the API. `averageRating` is the aggregator's last
/// computed value, never client-settable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
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

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            description: book.description,
            cover_image: book.cover_image,
            genre: book.genre,
            publication_date: book.publication_date,
            average_rating: book.average_rating,
            created_at: book.created_at,
        }
    }
}

/// Response envelope for the book listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListResponse {
    pub books: Vec<BookView>,
    pub total_pages: u32,
    pub current_page: u32,
}
