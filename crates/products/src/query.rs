//! Addressing, filtering and ordering of product records.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, StoreError};

use crate::product::Product;

/// Address of a write: the whole collection (narrowed by a filter) or one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Collection(ProductFilter),
    Item(ProductId),
}

impl Target {
    pub fn all() -> Self {
        Target::Collection(ProductFilter::default())
    }

    pub fn item_id(&self) -> Option<ProductId> {
        match self {
            Target::Item(id) => Some(*id),
            Target::Collection(_) => None,
        }
    }
}

impl From<ProductId> for Target {
    fn from(id: ProductId) -> Self {
        Target::Item(id)
    }
}

impl From<ProductFilter> for Target {
    fn from(filter: ProductFilter) -> Self {
        Target::Collection(filter)
    }
}

/// Row selection. Every present criterion must hold; an empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub ids: Option<Vec<ProductId>>,
    /// Case-insensitive (ASCII) substring match on the name.
    #[serde(default)]
    pub name_contains: Option<String>,
    #[serde(default)]
    pub min_quantity: Option<i64>,
    #[serde(default)]
    pub max_quantity: Option<i64>,
    /// `Some(true)`: quantity > 0. `Some(false)`: quantity == 0.
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.ids.is_none()
            && self.name_contains.is_none()
            && self.min_quantity.is_none()
            && self.max_quantity.is_none()
            && self.in_stock.is_none()
    }

    pub fn ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn name_contains(fragment: impl Into<String>) -> Self {
        Self {
            name_contains: Some(fragment.into()),
            ..Self::default()
        }
    }

    pub fn out_of_stock() -> Self {
        Self {
            in_stock: Some(false),
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&product.id) {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            let haystack = product.name.to_ascii_lowercase();
            if !haystack.contains(&fragment.to_ascii_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_quantity {
            if product.quantity < min {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if product.quantity > max {
                return false;
            }
        }
        match self.in_stock {
            Some(wanted) => product.in_stock() == wanted,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Quantity,
    Price,
}

impl SortKey {
    pub fn column(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Quantity => "quantity",
            SortKey::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Sort order of a listing. Ties are always broken by ascending id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOrder {
    pub key: SortKey,
    pub direction: Direction,
}

impl ProductOrder {
    pub fn by(key: SortKey, direction: Direction) -> Self {
        Self { key, direction }
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Quantity => a.quantity.cmp(&b.quantity),
            SortKey::Price => a.price.cmp(&b.price),
        };
        let primary = match self.direction {
            Direction::Asc => primary,
            Direction::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }
}

/// Parses `price`, `-price`, `name`, ... (`-` prefix means descending).
impl FromStr for ProductOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (direction, key) = match s.strip_prefix('-') {
            Some(rest) => (Direction::Desc, rest),
            None => (Direction::Asc, s),
        };
        let key = match key {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "quantity" => SortKey::Quantity,
            "price" => SortKey::Price,
            other => {
                return Err(StoreError::invalid_field(
                    "order",
                    format!("unknown sort key `{other}` (expected id, name, quantity or price)"),
                ));
            }
        };
        Ok(Self { key, direction })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub filter: ProductFilter,
    #[serde(default)]
    pub order: ProductOrder,
}

impl ProductQuery {
    pub fn new(filter: ProductFilter, order: ProductOrder) -> Self {
        Self { filter, order }
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// Apply filter and order to an in-memory snapshot.
    pub fn run<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products
            .into_iter()
            .filter(|p| self.filter.matches(p))
            .cloned()
            .collect();
        self.order.sort(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, quantity: i64, price: i64) -> Product {
        Product {
            id: ProductId::from_raw(id),
            name: name.to_string(),
            quantity,
            price,
            image_reference: None,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Mugs", 17, 8),
            product(2, "Plates", 0, 12),
            product(3, "Coffee mugs", 3, 8),
            product(4, "Bowls", 40, 5),
        ]
    }

    #[test]
    fn empty_filter_matches_everything_in_id_order() {
        let out = ProductQuery::all().run(&catalog());
        let ids: Vec<i64> = out.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let filter = ProductFilter::name_contains("MUG");
        let out = ProductQuery::new(filter, ProductOrder::default()).run(&catalog());
        let ids: Vec<i64> = out.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn stock_filters() {
        let out = ProductQuery::new(ProductFilter::out_of_stock(), ProductOrder::default()).run(&catalog());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Plates");

        let filter = ProductFilter {
            min_quantity: Some(3),
            max_quantity: Some(17),
            ..ProductFilter::default()
        };
        let out = ProductQuery::new(filter, ProductOrder::default()).run(&catalog());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn price_order_breaks_ties_by_id() {
        let order: ProductOrder = "-price".parse().unwrap();
        let out = ProductQuery::new(ProductFilter::default(), order).run(&catalog());
        let ids: Vec<i64> = out.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![2, 1, 3, 4]);
    }

    #[test]
    fn unknown_order_key_is_rejected() {
        let err = "colour".parse::<ProductOrder>().unwrap_err();
        assert_eq!(err.field(), Some("order"));
    }

    #[test]
    fn target_conversions() {
        let id = ProductId::from_raw(9);
        assert_eq!(Target::from(id).item_id(), Some(id));
        assert_eq!(Target::all().item_id(), None);
    }
}
