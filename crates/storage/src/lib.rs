//! Storage for generated records.
//!
//! The generation engine never writes here; callers that wrap it decide
//! what to keep. Only an in-memory backend ships today.

pub mod in_memory;

pub use in_memory::InMemoryRepository;
