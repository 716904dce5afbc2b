pub mod books;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use shelfmark_kernel::{ModuleRegistry, Settings};
use shelfmark_store::MemoryStore;

use reviews::service::ReviewService;

/// Register all application modules with the registry, wiring them to the
/// shared store.
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<MemoryStore>, settings: &Settings) {
    let service = Arc::new(ReviewService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        settings.pagination.clone(),
    ));

    registry.register(books::create_module(
        store.clone(),
        settings.pagination.clone(),
    ));
    registry.register(reviews::create_module(service));
    registry.register(users::create_module(store));
}
