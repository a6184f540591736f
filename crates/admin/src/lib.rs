//! Partitur Admin library.
//!
//! The back-office as a library, so the binary, the CLI and the tests share
//! one router and one set of repositories.
//!
//! # Security
//!
//! This crate holds the privileged side of the store:
//! - Catalog writes (products, composers, uploads)
//! - Manual transaction status changes
//! - Admin user management

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
