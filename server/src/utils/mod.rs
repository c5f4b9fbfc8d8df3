//! Utility functions for the application

pub mod api_key;
pub mod crypto;
pub mod file;
pub mod time;
