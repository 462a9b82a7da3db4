//! HTTP boundary of the product store: configuration, routing, and
//! request/response mapping.

pub mod app;
pub mod config;

pub use config::Config;
