//! Infrastructure layer: storage backends, write serialization, the product
//! store service and its notification workers.

pub mod cursor;
pub mod locks;
pub mod repository;
pub mod store;
pub mod workers;

pub use cursor::ProductCursor;
pub use locks::RecordLocks;
pub use repository::{InMemoryProductRepository, Page, ProductRepository, SqliteProductRepository};
pub use store::{DEFAULT_PAGE_SIZE, ProductStore};
pub use workers::{NotificationWorker, WorkerHandle};
