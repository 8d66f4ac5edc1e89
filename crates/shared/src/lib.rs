//! Shared utilities and common types for the Access Desk backend.
//!
//! This crate provides common functionality used across all other crates:
//! - The application error taxonomy
//! - Cursor-based pagination tokens
//! - Common validation logic

pub mod error;
pub mod pagination;
pub mod validation;
