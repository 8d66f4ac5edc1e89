//! Domain layer for the Access Desk backend.
//!
//! This crate contains:
//! - Domain models (approval requests, flows, resources, memberships)
//! - The approval workflow engine and its collaborator interfaces
//! - Catalog configuration and authorization rules

pub mod models;
pub mod services;
