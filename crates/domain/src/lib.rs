//! Domain layer for Quizhub.
//!
//! This crate contains:
//! - Domain models (Quiz, Registration, User)
//! - The registration admission engine and derived views
//! - Store ports implemented by the persistence layer

pub mod models;
pub mod services;
