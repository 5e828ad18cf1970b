//! Pure allocation, requirement and progress rules
//!
//! The backend executes these plans inside a database transaction; nothing
//! here touches storage.

mod fifo;
mod progress;
mod resolver;

pub use fifo::*;
pub use progress::*;
pub use resolver::*;
