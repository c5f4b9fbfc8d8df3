//! API route handlers

pub mod analytics;
pub mod health;
pub mod sessions;
pub mod traces;
