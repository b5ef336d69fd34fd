//! Shared primitives and traits for the Velella factor-enrichment workspace.
//!
//! `velella-core` provides the foundation the other Velella crates build on:
//!
//! - **Error types** — [`VelellaError`] and [`Result`] for structured error handling
//! - **Traits** — Cross-cutting abstractions like [`Summarizable`]

pub mod error;
pub mod traits;

pub use error::{Result, VelellaError};
pub use traits::*;
