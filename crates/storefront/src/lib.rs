//! Adroit Shop storefront cart library.
//!
//! Guest and account shopping carts behind one [`cart::CartFacade`], the
//! guest-to-account merge run at login, and the REST client and local storage
//! they sit on.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod compare;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use session::ShopSession;
