//! Adapters implementing the domain store ports.

pub mod in_memory;
