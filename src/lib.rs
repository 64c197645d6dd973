//! Library crate entry point.
//! Exposes the guard, its stores and the administration layer to the
//! binary in src/main.rs and to integration tests.

pub mod admin;
pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod store;
pub mod validators;
