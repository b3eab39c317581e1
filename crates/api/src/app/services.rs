//! Store wiring behind the service traits.

use std::sync::Arc;

use lotledger_core::LedgerResult;
use lotledger_store::{Catalog, MemoryStore, PostgresStore, TraceabilityLedger};

/// The services handlers reach through `Extension`.
pub struct AppServices {
    pub catalog: Arc<dyn Catalog>,
    pub ledger: Arc<dyn TraceabilityLedger>,
}

/// In-memory store (dev/tests): nothing is persisted.
pub fn build_memory_services() -> AppServices {
    let store = Arc::new(MemoryStore::new());
    AppServices {
        catalog: store.clone(),
        ledger: store,
    }
}

/// Postgres store: connects, runs pending migrations, and serves from the
/// shared pool.
pub async fn build_postgres_services(database_url: &str) -> LedgerResult<AppServices> {
    let store = PostgresStore::connect(database_url).await?;
    store.migrate().await?;
    let store = Arc::new(store);
    Ok(AppServices {
        catalog: store.clone(),
        ledger: store,
    })
}
