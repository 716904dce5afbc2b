use std::sync::Arc;

use anyhow::Context;

use shelfmark_kernel::{InitCtx, ModuleRegistry, Settings};
use shelfmark_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load shelfmark settings")?;
    shelfmark_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        "shelfmark bootstrap starting"
    );

    let store = Arc::new(MemoryStore::new());

    let mut registry = ModuleRegistry::new();
    shelfmark_app::register_all(&mut registry, store, &settings);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    shelfmark_http::start_server(&registry, &settings).await?;

    registry.stop_all().await?;
    Ok(())
}
