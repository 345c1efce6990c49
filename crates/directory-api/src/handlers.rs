//! API handlers.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod contacts;
pub mod frontend;
pub mod health;
pub mod suppliers;
pub mod tokens;
pub mod vendors;

pub use health::*;
