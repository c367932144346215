//! Adroit Shop Core - Shared types library.
//!
//! This crate provides the domain types used across all Adroit Shop components:
//! - `storefront` - Cart stores, facade and guest-to-account reconciliation
//! - `cli` - Command-line driver for the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart arithmetic - no I/O, no
//! HTTP clients, no storage. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Product identifiers, sizes, prices and the cart model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
