//! # boleteria-core
//!
//! Core crate for the Veneventos boletería. Contains configuration
//! schemas, typed identifiers, the seat/table resource sum type,
//! lifecycle signals, the retry policy, clock/auth/key-value seams, and
//! the unified error system.
//!
//! This crate has **no** internal dependencies on other boletería crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
