pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;

use shelfmark_http::{AppError, Identity};
use shelfmark_kernel::{settings::PaginationSettings, InitCtx, Module};
use shelfmark_store::{BookId, BookQuery, BookStore, NewBook};

use models::{BookListResponse, BookView, CreateBookBody, ListBooksQuery};

/// Books module: browse the catalog and (admin-only) add books. The
/// `averageRating` on every response is the rating aggregator's last
/// computed value.
pub struct BooksModule {
    state: BooksState,
}

#[derive(Clone)]
struct BooksState {
    books: Arc<dyn BookStore>,
    pagination: PaginationSettings,
}

impl BooksModule {
    pub fn new(books: Arc<dyn BookStore>, pagination: PaginationSettings) -> Self {
        Self {
            state: BooksState { books, pagination },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route("/{id}", get(get_book))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, newest first",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "genre", "in": "query", "schema": { "type": "string" } },
                            { "name": "search", "in": "query", "schema": { "type": "string" } },
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book (admin only)",
                        "tags": ["Books"],
                        "responses": {
                            "201": { "description": "Created book" },
                            "401": { "description": "Missing caller identity" },
                            "403": { "description": "Caller lacks admin capability" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "Book" },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "description": { "type": "string" },
                            "coverImage": { "type": "string" },
                            "genre": { "type": "string" },
                            "publicationDate": { "type": "string", "format": "date" },
                            "averageRating": { "type": "number", "minimum": 0, "maximum": 5 },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "genre", "averageRating"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            },
                            "totalPages": { "type": "integer" },
                            "currentPage": { "type": "integer" }
                        },
                        "required": ["books", "totalPages", "currentPage"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// GET / — public catalog listing with genre and search filters.
async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<BookListResponse>, AppError> {
    let page = query.page.filter(|page| *page >= 1).unwrap_or(1);
    let page_size = query
        .limit
        .filter(|limit| *limit >= 1)
        .unwrap_or(state.pagination.default_page_size)
        .min(state.pagination.max_page_size);

    let listed = state
        .books
        .list_books(
            BookQuery {
                genre: query.genre,
                search: query.search,
            },
            page,
            page_size,
        )
        .await?;

    Ok(Json(BookListResponse {
        books: listed.items.into_iter().map(BookView::from).collect(),
        total_pages: listed.total_pages,
        current_page: listed.current_page,
    }))
}

/// GET /{id} — book detail with the last computed average.
async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<Json<BookView>, AppError> {
    let book = state.books.get_book(id).await?;
    Ok(Json(BookView::from(book)))
}

/// POST / — admin-only add-book operation.
async fn create_book(
    State(state): State<BooksState>,
    identity: Identity,
    Json(body): Json<CreateBookBody>,
) -> Result<(StatusCode, Json<BookView>), AppError> {
    if !identity.is_admin {
        return Err(AppError::forbidden("adding books requires admin capability"));
    }

    let book = state
        .books
        .add_book(NewBook {
            title: body.title,
            author: body.author,
            description: body.description,
            cover_image: body.cover_image,
            genre: body.genre,
            publication_date: body.publication_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(BookView::from(book))))
}

/// Create a new instance of the books module.
pub fn create_module(
    books: Arc<dyn BookStore>,
    pagination: PaginationSettings,
) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(books, pagination))
}
