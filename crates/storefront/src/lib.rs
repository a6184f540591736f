//! Partitur storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod midtrans;
pub mod models;
pub mod routes;
pub mod seo;
pub mod services;
pub mod state;
