//! Typed async client for the bookstore storefront API.
//!
//! Views are plain service objects built from a [`shop::Storefront`]: the session, the
//! cart/wishlist/category caches and the notification queue are injected, never looked up.

pub mod admin;
pub mod api;
pub mod cache;
pub mod checkout;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod notify;
pub mod rows;
pub mod session;
pub mod shop;
pub mod storage;
pub mod validation;
pub mod verify;

pub use config::Config;
pub use error::{ApiError, Result};
pub use shop::Storefront;
