//! dc_store — the replicated-store collaborator contract
//!
//! The chat core runs against an eventually-consistent, multi-writer
//! replicated graph store. The store's contract is deliberately thin:
//! fire-and-forget `put`, and `subscribe_all` delivering every value ever
//! written under a path — past and future, at-least-once, in no particular
//! order. Everything above this crate must tolerate duplicates and
//! reordering; nothing above it may block unboundedly on a read.
//!
//! # Modules
//! - `store`  — `ReplicatedStore` trait, record/subscription types, bounded reads
//! - `memory` — in-memory implementation for tests and local development
//! - `error`  — store error type

pub mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{bounded_find, ReplicatedStore, StoreRecord, StoreSubscription};
