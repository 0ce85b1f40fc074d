//! Shared types and models for the stock ledger
//!
//! This crate contains types shared between the backend, the browser-side
//! import preview (via WASM), and other components of the system.

pub mod import;
pub mod models;
pub mod types;
pub mod validation;

pub use import::*;
pub use models::*;
pub use types::*;
pub use validation::*;
