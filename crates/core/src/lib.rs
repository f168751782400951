//! Souq Core - domain types and business rules.
//!
//! This crate holds everything that does not touch the network or disk:
//! - `admin` - HTTP server, persistence backends and the autosave loop
//! - `cli` - Command-line tools for migrations and offline reports
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, phones, emails, money and statuses
//! - [`model`] - The global and per-store documents and their operations
//! - [`fees`] - Courier fee and net profit calculation
//! - [`settlement`] - Wallet postings triggered by order status changes
//! - [`customers`] - Customer profiles aggregated from orders
//! - [`access`] - Permission resolution for owners, admins and employees

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod customers;
pub mod error;
pub mod fees;
pub mod model;
pub mod settlement;
pub mod types;

pub use access::{Access, Role};
pub use customers::{CustomerNote, CustomerProfile};
pub use error::DomainError;
pub use fees::{CollectionsReport, FeeBreakdown, FeeConfig, FeeInput};
pub use model::*;
pub use types::*;
