//! HTTP request handlers

pub mod bom;
pub mod health;
pub mod inventory;
pub mod production;
pub mod stage;

pub use bom::*;
pub use health::*;
pub use inventory::*;
pub use production::*;
pub use stage::*;
