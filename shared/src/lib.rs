//! Shared types, models and the pure production engine for Woodflow
//!
//! Everything in this crate is free of I/O so that the backend, the WASM
//! previews and the test suites all run the exact same allocation, BOM and
//! progress rules.

pub mod engine;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
