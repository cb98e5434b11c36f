//! Till - checkout and payment reconciliation
//!
//! A Rust implementation of a cart, checkout and order status
//! reconciliation pipeline for payment-gateway backed commerce flows.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod facade;
pub mod gateway;
pub mod interfaces;
pub mod notify;
pub mod pricing;
pub mod reconcile;
pub mod storage;
pub mod sync;
pub mod types;
pub mod utils;

pub use facade::{Till, TillBuilder};
