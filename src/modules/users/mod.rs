use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use shelfmark_http::{AppError, Identity};
use shelfmark_kernel::{InitCtx, Module};
use shelfmark_store::{UserDirectory, UserId, UserProfile};

/// Users module: display profiles backing the owner attributes attached to
/// review responses. Authentication itself lives with the external identity
/// provider; this module only stores what a reviewer looks like.
pub struct UsersModule {
    users: Arc<dyn UserDirectory>,
}

impl UsersModule {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

/// Request body for upserting the caller's own profile.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProfileBody {
    pub username: String,
    pub avatar: Option<String>,
}

/// Profile as exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            avatar: profile.avatar,
        }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/profile", put(put_profile))
            .route("/{id}", get(get_profile))
            .with_state(self.users.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/{id}": {
                    "get": {
                        "summary": "Get a user's display profile",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "Profile",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Profile" }
                                    }
                                }
                            },
                            "404": { "description": "No profile stored for this user" }
                        }
                    }
                },
                "/profile": {
                    "put": {
                        "summary": "Upsert the caller's own display profile",
                        "tags": ["Users"],
                        "responses": {
                            "200": { "description": "Stored profile" },
                            "401": { "description": "Missing caller identity" },
                            "422": { "description": "Empty username" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Profile": {
                        "type": "object",
                        "properties": {
                            "userId": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "avatar": { "type": "string" }
                        },
                        "required": ["userId", "username", "avatar"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}

/// GET /{id} — public display profile lookup.
async fn get_profile(
    State(users): State<Arc<dyn UserDirectory>>,
    Path(id): Path<UserId>,
) -> Result<Json<ProfileView>, AppError> {
    let profile = users
        .get_profile(id)
        .await?
        .ok_or_else(|| AppError::not_found("profile not found"))?;
    Ok(Json(ProfileView::from(profile)))
}

/// PUT /profile — upsert the authenticated caller's own profile.
async fn put_profile(
    State(users): State<Arc<dyn UserDirectory>>,
    identity: Identity,
    Json(body): Json<UpsertProfileBody>,
) -> Result<Json<ProfileView>, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "username", "error": "must not be empty"})],
            "username must not be empty",
        ));
    }

    let stored = users
        .upsert_profile(UserProfile {
            user_id: identity.user_id,
            username: username.to_string(),
            avatar: body
                .avatar
                .filter(|avatar| !avatar.trim().is_empty())
                .unwrap_or_else(|| "default-avatar.png".to_string()),
        })
        .await?;

    Ok(Json(ProfileView::from(stored)))
}

/// Create a new instance of the users module.
pub fn create_module(users: Arc<dyn UserDirectory>) -> Arc<dyn Module> {
    Arc::new(UsersModule::new(users))
}
