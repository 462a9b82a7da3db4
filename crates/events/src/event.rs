use chrono::{DateTime, Utc};

/// A notification published after a durable write.
///
/// Notifications are facts: immutable, cheap to clone, safe to deliver more
/// than once.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable topic name (e.g. "products.changed").
    fn event_type(&self) -> &'static str;

    /// When the write completed.
    fn occurred_at(&self) -> DateTime<Utc>;
}
