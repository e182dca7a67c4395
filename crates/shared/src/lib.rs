//! Shared utilities and common types for Quizhub.
//!
//! This crate provides common functionality used across all other crates:
//! - Team roster, schedule and contact validation
//! - Quiz schedule text parsing and formatting

pub mod time;
pub mod validation;
