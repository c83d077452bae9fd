//! notesync - client-side view synchronization for a remote note store.
//!
//! This library keeps a local working copy of a user's notes in step with
//! the store and derives what the note list should show:
//! - Data models (Note, NoteDraft, NotePatch, Snapshot)
//! - Remote gateway (trait, HTTP client, in-memory store)
//! - Synchronization engine driven by an invalidation token
//! - Debounced search and the filtered, ordered view
//! - Mutation coordinator (create, update, delete, pin)
//! - Plain-text / Markdown export
//! - Configuration management
//!
//! # Feature Flags
//!
//! - `desktop`: Detect the platform config directory when none is given.

pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod gateway;
pub mod http_gateway;
pub mod invalidation;
pub mod memory_gateway;
pub mod models;
pub mod mutation;
pub mod selection;
pub mod sync_engine;
pub mod validation;
pub mod view;

// Re-export commonly used types
pub use client::NotesClient;
pub use config::Config;
pub use error::{NoteError, NoteResult, ValidationError};
pub use gateway::NoteGateway;
pub use http_gateway::{HttpNoteGateway, Session};
pub use invalidation::InvalidationToken;
pub use memory_gateway::MemoryNoteGateway;
pub use models::{Note, NoteDraft, NoteId, NotePatch, Snapshot};
pub use sync_engine::{SyncEngine, SyncState};
