//! Append-only registries of request types and domains.
//!
//! Entries are keyed by their hash and never removed or mutated;
//! registering the same entry again is a successful no-op.

pub mod domains;
pub mod types;

pub use domains::DomainRegistry;
pub use types::TypeRegistry;
