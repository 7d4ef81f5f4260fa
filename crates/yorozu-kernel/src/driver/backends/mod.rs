//! Built-in drivers.

mod local;
mod memory;

pub use local::{LocalAddition, LocalDriver};
pub use memory::{MemoryAddition, MemoryDriver};
