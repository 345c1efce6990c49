//! REST API for the supplier directory.
//!
//! This crate provides:
//! - Axum routes for vendors, suppliers, categories and contacts
//! - Session login with CSRF protection, and JWT issuance
//! - Public and authenticated serializations
//! - Optional page-number pagination
//! - Staff-only admin listings and supplier password reveal
//! - Request-ID and access-log middleware

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod nullable;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod state;
pub mod views;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
