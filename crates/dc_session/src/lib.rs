//! dc_session — orchestration of the dchat end-to-end encrypted core
//!
//! Everything here is process-scoped state constructed at sign-in and torn
//! down at sign-out; there are no ambient globals. A [`ChatSession`] wires
//! the three lower layers together for one signed-in identity and one
//! conversation peer:
//!
//! ```text
//! dc_crypto (codec)  →  KeyDirectory  →  MessageFeed  →  ChatSession
//! ```
//!
//! The feed consumes the replicated store's at-least-once, unordered
//! record stream and delivers each distinct message at most once, already
//! decrypted and authenticated. Per-arrival failures never terminate the
//! feed; they surface as [`FeedDiagnostic`] events, while `send` failures
//! surface synchronously to the caller.
//!
//! # Modules
//! - `auth`        — identity-provider handoff types
//! - `config`      — session configuration (paths, timeouts, key size)
//! - `directory`   — published public keys, bounded-wait resolution
//! - `feed`        — deduplicating decrypt+verify ingestion pipeline
//! - `session`     — the per-conversation façade: `send` + live messages
//! - `error`       — session error type

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod feed;
pub mod session;

pub use auth::SignedInUser;
pub use config::SessionConfig;
pub use directory::KeyDirectory;
pub use error::SessionError;
pub use feed::{FeedDiagnostic, MessageFeed};
pub use session::ChatSession;
