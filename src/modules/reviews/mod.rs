pub mod aggregate;
pub mod models;
pub mod service;

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
use shelfmark_kernel::{InitCtx, Module};
use shelfmark_store::{ReviewId, ReviewPatch};

use models::{
    CreateReviewBody, DeleteConfirmation, ListReviewsQuery, ReviewListResponse, ReviewView,
    UpdateReviewBody,
};
use service::{Caller, ReviewService};

/// Reviews module: one review per (user, book), owner-gated mutation, and
/// the consistency of every book's derived average rating.
pub struct ReviewsModule {
    service: Arc<ReviewService>,
}

impl ReviewsModule {
    pub fn new(service: Arc<ReviewService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_reviews).post(create_review))
            .route("/{id}", axum::routing::put(update_review).delete(delete_review))
            .with_state(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List reviews, newest first",
                        "tags": ["Reviews"],
                        "parameters": [
                            { "name": "bookId", "in": "query", "schema": { "type": "string", "format": "uuid" } },
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Page of reviews with owner display attributes",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ReviewPage" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a review (one per user per book)",
                        "tags": ["Reviews"],
                        "responses": {
                            "201": {
                                "description": "Created review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Review" }
                                    }
                                }
                            },
                            "401": { "description": "Missing caller identity" },
                            "404": { "description": "Book not found" },
                            "409": { "description": "Book already reviewed by this user" },
                            "422": { "description": "Invalid rating or empty text" }
                        }
                    }
                },
                "/{id}": {
                    "put": {
                        "summary": "Update own review (partial; owner only)",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": { "description": "Updated review" },
                            "403": { "description": "Caller is not the review owner" },
                            "404": { "description": "Review not found" }
                        }
                    },
                    "delete": {
                        "summary": "Delete a review (owner or admin)",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": { "description": "Review removed" },
                            "403": { "description": "Caller is neither owner nor admin" },
                            "404": { "description": "Review not found" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "bookId": { "type": "string", "format": "uuid" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "title": { "type": "string" },
                            "reviewText": { "type": "string" },
                            "user": { "$ref": "#/components/schemas/OwnerDisplay" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "bookId", "rating", "title", "reviewText", "user"]
                    },
                    "OwnerDisplay": {
                        "type": "object",
                        "properties": {
                            "userId": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "avatar": { "type": "string" }
                        },
                        "required": ["userId", "username", "avatar"]
                    },
                    "ReviewPage": {
                        "type": "object",
                        "properties": {
                            "reviews": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            },
                            "totalPages": { "type": "integer" },
                            "currentPage": { "type": "integer" }
                        },
                        "required": ["reviews", "totalPages", "currentPage"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

/// GET / — public listing; no identity required.
async fn list_reviews(
    State(service): State<Arc<ReviewService>>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<ReviewListResponse>, AppError> {
    let listed = service
        .list(query.book_id, query.page, query.limit)
        .await?;
    Ok(Json(listed))
}

/// POST / — create a review for the authenticated caller.
async fn create_review(
    State(service): State<Arc<ReviewService>>,
    identity: Identity,
    Json(body): Json<CreateReviewBody>,
) -> Result<(StatusCode, Json<ReviewView>), AppError> {
    let created = service
        .create(
            caller(identity),
            body.book_id,
            body.rating,
            &body.title,
            &body.review_text,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /{id} — partial update, owner only.
async fn update_review(
    State(service): State<Arc<ReviewService>>,
    identity: Identity,
    Path(id): Path<ReviewId>,
    Json(body): Json<UpdateReviewBody>,
) -> Result<Json<ReviewView>, AppError> {
    let updated = service
        .update(
            caller(identity),
            id,
            ReviewPatch {
                rating: body.rating,
                title: body.title,
                review_text: body.review_text,
            },
        )
        .await?;
    Ok(Json(updated))
}

/// DELETE /{id} — owner or admin.
async fn delete_review(
    State(service): State<Arc<ReviewService>>,
    identity: Identity,
    Path(id): Path<ReviewId>,
) -> Result<Json<DeleteConfirmation>, AppError> {
    service.delete(caller(identity), id).await?;
    Ok(Json(DeleteConfirmation::removed()))
}

fn caller(identity: Identity) -> Caller {
    Caller {
        user_id: identity.user_id,
        is_admin: identity.is_admin,
    }
}

/// Create a new instance of the reviews module.
pub fn create_module(service: Arc<ReviewService>) -> Arc<dyn Module> {
    Arc::new(ReviewsModule::new(service))
}
