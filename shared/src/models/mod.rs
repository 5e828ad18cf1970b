//! Domain models for the Woodflow production engine

mod bom;
mod item;
mod ledger;
mod lot;
mod production;
mod stage;
mod warehouse;

pub use bom::*;
pub use item::*;
pub use ledger::*;
pub use lot::*;
pub use production::*;
pub use stage::*;
pub use warehouse::*;
