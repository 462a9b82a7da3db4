//! The single notification topic of the store: "the products collection changed".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::ProductId;

use crate::event::Event;

/// What kind of mutation produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Published on the products topic after any mutation that touched rows.
///
/// Consumers re-fetch on receipt; no diff is carried. `product_id` is set when
/// the write addressed a single record and `None` for bulk writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsChanged {
    pub kind: ChangeKind,
    pub product_id: Option<ProductId>,
    pub rows: u64,
    pub occurred_at: DateTime<Utc>,
}

impl ProductsChanged {
    pub const TOPIC: &'static str = "products.changed";

    pub fn new(kind: ChangeKind, product_id: Option<ProductId>, rows: u64) -> Self {
        Self {
            kind,
            product_id,
            rows,
            occurred_at: Utc::now(),
        }
    }
}

impl Event for ProductsChanged {
    fn event_type(&self) -> &'static str {
        Self::TOPIC
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_in_lowercase() {
        let change = ProductsChanged::new(ChangeKind::Deleted, Some(ProductId::from_raw(3)), 1);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert_eq!(json["product_id"], 3);
        assert_eq!(json["rows"], 1);
        assert_eq!(change.event_type(), "products.changed");
    }
}
