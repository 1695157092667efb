// # Store Implementations
//
// In-process implementations of the Store trait. The persistent SQLite
// store lives in the `domwatch-store-sqlite` crate.

pub mod memory;

pub use memory::{MemoryStore, MemoryStoreFactory};
