//! HTTP route handlers.

pub mod flows;
pub mod health;
pub mod requests;
