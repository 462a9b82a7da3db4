use serde::Deserialize;

use stockroom_core::StoreResult;
use stockroom_products::{ProductFilter, ProductOrder, ProductQuery};

// -------------------------
// Request DTOs
// -------------------------

/// Query-string selection shared by list, bulk update and bulk delete.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    /// Case-insensitive name fragment.
    pub name: Option<String>,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub in_stock: Option<bool>,
    /// `id`, `name`, `quantity`, `price`; `-` prefix for descending.
    pub order: Option<String>,
}

impl SelectionParams {
    pub fn to_filter(&self) -> ProductFilter {
        ProductFilter {
            ids: None,
            name_contains: self.name.clone(),
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            in_stock: self.in_stock,
        }
    }

    pub fn to_query(&self) -> StoreResult<ProductQuery> {
        let order = match &self.order {
            Some(raw) => raw.parse::<ProductOrder>()?,
            None => ProductOrder::default(),
        };
        Ok(ProductQuery::new(self.to_filter(), order))
    }
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub amount: i64,
}
