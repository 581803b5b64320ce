//! dc_proto — wire types and record validation for dchat
//!
//! Everything the replicated store carries is JSON with camelCase field
//! names, matching what non-Rust clients already write. Records arriving
//! from the store are untrusted: they are shape-validated here before any
//! key resolution or crypto work happens.
//!
//! # Modules
//! - `envelope`  — the persisted, encrypted+signed representation of one message
//! - `keyrecord` — a published public key for one identity
//! - `message`   — the UI-facing plaintext message (post-verification only)

pub mod envelope;
pub mod error;
pub mod keyrecord;
pub mod message;

pub use envelope::Envelope;
pub use error::ProtoError;
pub use keyrecord::KeyRecord;
pub use message::PlaintextMessage;
