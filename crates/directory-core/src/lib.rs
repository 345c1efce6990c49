//! # Directory Core
//!
//! Core domain types for the supplier directory.
//!
//! This crate provides the foundational types used throughout the system:
//! - Typed database identifiers (newtype pattern)
//! - Vendors, suppliers, categories and contacts
//! - Field validation rules shared by the API and the import commands
//! - Search matching and the primary-contact rule
//! - Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod vendor;
pub mod supplier;
pub mod category;
pub mod contact;
pub mod user;
pub mod query;
pub mod search;
pub mod validation;

pub use error::{DirectoryError, DirectoryResult, ValidationError};
pub use id::*;
pub use vendor::*;
pub use supplier::*;
pub use category::*;
pub use contact::{Contact, ContactDraft, ContactPatch, ContactQuery};
pub use user::*;
pub use query::{ListQuery, Page};
