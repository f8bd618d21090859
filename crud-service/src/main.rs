//! Roles service over the in-memory store

use std::sync::Arc;

use crud_service::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let store = Arc::new(InMemoryStore::<Role>::new());
    let roles = EntityUseCase::<Role, _, _>::new(Arc::clone(&store), store, Arc::new(SystemClock))
        .with_timeout(config.usecase.timeout())
        .with_limits(config.usecase.limits());

    tracing::info!(?roles, "roles use case ready");

    let app = Router::new().nest("/roles", entity_router(roles));
    Server::new(config).serve(app).await
}
