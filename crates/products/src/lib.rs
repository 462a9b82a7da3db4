//! Products domain module.
//!
//! Business rules for product records implemented as deterministic domain
//! logic (no IO, no HTTP, no storage): field validation, partial updates,
//! filtering/ordering, and the quantity arithmetic behind sales and restocks.

pub mod query;
pub mod product;

pub use product::{NewProduct, Product, ProductDraft, ProductPatch, SaleOutcome, restocked};
pub use query::{Direction, ProductFilter, ProductOrder, ProductQuery, SortKey, Target};
