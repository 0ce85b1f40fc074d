//! Domain models for the stock ledger

mod directory;
mod stock;
mod user;

pub use directory::*;
pub use stock::*;
pub use user::*;
