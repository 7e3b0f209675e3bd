use std::sync::Arc;

use tracing::info;

use super::{
    config::{Config, StoreBackend},
    database::RedisStore,
    identity::IdentityResolver,
    memory::MemoryStore,
    store::{Store, StoreError},
    votes::InFlightVotes,
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub identity: IdentityResolver,
    pub in_flight: InFlightVotes,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store: Arc<dyn Store> = match config.store_backend {
            StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            StoreBackend::Memory => {
                info!("Using in-memory store, nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            config,
            identity: IdentityResolver::new(store.clone()),
            store,
            in_flight: InFlightVotes::default(),
        })
    }
}
