// Adapters layer: concrete implementations of the domain ports and file formats.

pub mod identify;
pub mod memory_store;
pub mod roster_csv;
