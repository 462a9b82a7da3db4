use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use stockroom_events::ProductsChanged;
use stockroom_infra::{
    InMemoryProductRepository, NotificationWorker, ProductRepository, ProductStore,
    SqliteProductRepository, WorkerHandle,
};

use crate::config::Config;

/// Store type served over HTTP; the backend is picked at startup.
pub type SharedStore = ProductStore<Arc<dyn ProductRepository>>;

const REALTIME_CAPACITY: usize = 1024;

/// Runtime services shared by all handlers.
pub struct AppServices {
    store: SharedStore,
    realtime_tx: broadcast::Sender<ProductsChanged>,
    _notifier: WorkerHandle,
}

impl AppServices {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let repo: Arc<dyn ProductRepository> = if config.uses_memory() {
            tracing::info!("using in-memory product table");
            Arc::new(InMemoryProductRepository::new())
        } else {
            Arc::new(SqliteProductRepository::connect(&config.database_url).await?)
        };

        Ok(Self::from_store(
            ProductStore::new(repo).with_page_size(config.page_size),
        )?)
    }

    /// Wrap an existing store and start forwarding its notifications to SSE
    /// subscribers.
    pub fn from_store(store: SharedStore) -> std::io::Result<Self> {
        let (realtime_tx, _) = broadcast::channel(REALTIME_CAPACITY);

        // Lossy hand-off: no SSE client connected is not an error.
        let tx = realtime_tx.clone();
        let notifier = NotificationWorker::spawn("products-sse", store.subscribe(), move |change| {
            let _ = tx.send(change);
            Ok::<(), Infallible>(())
        })?;

        Ok(Self {
            store,
            realtime_tx,
            _notifier: notifier,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<ProductsChanged> {
        &self.realtime_tx
    }
}

/// Build the SSE stream served on `/products/stream`.
pub fn products_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    // Lagged receivers skip ahead; clients re-fetch on the next event anyway.
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(change) => {
            let data = serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(ProductsChanged::TOPIC).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
