//! Core domain types and logic.

pub mod date_span;
pub mod error;
pub mod freshness;
pub mod price;
pub mod query;
pub mod resolver;
