//! Persistence layer for Quizhub.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Store adapters implementing the domain store ports, one backed by
//!   PostgreSQL and one held in memory

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod postgres;
pub mod repositories;

pub use db::DatabaseConfig;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
