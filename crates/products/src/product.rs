use serde::{Deserialize, Deserializer, Serialize};

use stockroom_core::{Entity, ProductId, StoreError, StoreResult};

/// A persisted product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    /// Price in the smallest currency unit.
    pub price: i64,
    pub image_reference: Option<String>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Product {
    /// Build the stored record for a freshly inserted draft.
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            quantity: draft.quantity,
            price: draft.price,
            image_reference: draft.image_reference,
        }
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Candidate for insertion. Has no id; the store assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub image_reference: Option<String>,
}

impl NewProduct {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_image(mut self, image_reference: impl Into<String>) -> Self {
        self.image_reference = Some(image_reference.into());
        self
    }

    /// Validate the candidate and resolve defaults (absent quantity/price → 0).
    pub fn validate(&self) -> StoreResult<ProductDraft> {
        ensure_name(&self.name)?;
        let quantity = self.quantity.unwrap_or(0);
        ensure_non_negative("quantity", quantity)?;
        let price = self.price.unwrap_or(0);
        ensure_non_negative("price", price)?;

        Ok(ProductDraft {
            name: self.name.clone(),
            quantity,
            price,
            image_reference: self.image_reference.clone(),
        })
    }
}

/// A validated candidate with defaults applied, ready to be written.
///
/// Only obtainable through [`NewProduct::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    name: String,
    quantity: i64,
    price: i64,
    image_reference: Option<String>,
}

impl ProductDraft {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn image_reference(&self) -> Option<&str> {
        self.image_reference.as_deref()
    }
}

/// Partial update. Only fields that are `Some` are written.
///
/// `image_reference` is doubly optional: `Some(None)` clears the reference,
/// `None` leaves it untouched. In JSON an explicit `null` clears it and an
/// absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_reference: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn price(price: i64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn image_reference(image_reference: Option<String>) -> Self {
        Self {
            image_reference: Some(image_reference),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.image_reference.is_none()
    }

    /// Validate every present field. Nothing is written if this fails.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(name) = &self.name {
            ensure_name(name)?;
        }
        if let Some(quantity) = self.quantity {
            ensure_non_negative("quantity", quantity)?;
        }
        if let Some(price) = self.price {
            ensure_non_negative("price", price)?;
        }
        Ok(())
    }

    /// Apply the present fields to a record. The id is never touched.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_reference) = &self.image_reference {
            product.image_reference = image_reference.clone();
        }
    }
}

/// Result of selling one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    /// Quantity written back to the record.
    pub quantity: i64,
    /// The record was already out of stock; quantity was held at zero.
    pub floored: bool,
}

impl SaleOutcome {
    /// Quantity after selling one unit from `current`, never below zero.
    pub fn sell_one(current: i64) -> Self {
        if current <= 0 {
            Self {
                quantity: 0,
                floored: true,
            }
        } else {
            Self {
                quantity: current - 1,
                floored: false,
            }
        }
    }
}

/// Quantity after receiving `amount` units on top of `current`.
pub fn restocked(current: i64, amount: i64) -> StoreResult<i64> {
    if amount < 1 {
        return Err(StoreError::invalid_field("amount", "must be at least 1"));
    }
    current
        .max(0)
        .checked_add(amount)
        .ok_or_else(|| StoreError::invalid_field("quantity", "restock would overflow"))
}

fn ensure_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::invalid_field("name", "product requires a name"));
    }
    Ok(())
}

fn ensure_non_negative(field: &'static str, value: i64) -> StoreResult<()> {
    if value < 0 {
        return Err(StoreError::invalid_field(
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(())
}
