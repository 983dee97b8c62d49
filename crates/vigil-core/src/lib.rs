//! Core types and trait definitions for Vigil.
//!
//! This crate is deliberately free of HTTP, database, and model-format
//! dependencies. Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod error;
pub mod store;
pub mod student;
pub mod user;

pub use error::{Error, Result};
