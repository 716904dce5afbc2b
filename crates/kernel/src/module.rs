use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during initialization and startup.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Lifecycle contract every Shelfmark module implements.
///
/// Modules are registered once at bootstrap and driven through
/// `init` -> `start` -> (serve) -> `stop` by the [`crate::ModuleRegistry`].
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; module routes are mounted under `/api/{name}`.
    fn name(&self) -> &'static str;

    /// Called during application startup, before the HTTP server binds.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Axum router for this module's routes.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment for this module, merged into the service document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Start background work. Called after all modules initialized.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources during shutdown.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
