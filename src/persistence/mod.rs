//! Persistence layer for orders
//!
//! This module defines the order store contract the services are written against:
//! - `OrderStore` trait (insert, point lookup, unplaced scan, conditional update)
//! - `InMemoryOrderStore` for tests and database-less runs
//!
//! The PostgreSQL implementation lives in `adapters::postgres`.

pub mod memory;
pub mod order_store;

pub use memory::InMemoryOrderStore;
pub use order_store::OrderStore;
