//! Background threads that consume change notifications.

pub mod notification_worker;

pub use notification_worker::{NotificationWorker, WorkerHandle};
