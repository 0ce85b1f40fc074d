//! HTTP request handlers

pub mod directory;
pub mod health;
pub mod reconciliation;
pub mod reporting;
pub mod stock;

pub use directory::*;
pub use health::*;
pub use reconciliation::*;
pub use reporting::*;
pub use stock::*;
