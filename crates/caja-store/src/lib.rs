//! # caja-store: Persistence Layer for Caja
//!
//! Owns the snapshot file on disk. caja-core never touches the file
//! system; this crate loads a [`Snapshot`](caja_core::snapshot::Snapshot),
//! hands it to the engine, and writes the result back.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    caja-store (THIS CRATE)                       │
//! │                                                                  │
//! │   ┌───────────────┐     ┌───────────────┐    ┌──────────────┐   │
//! │   │   FileStore   │     │    export     │    │   seed bin   │   │
//! │   │  (store.rs)   │     │  (export.rs)  │    │ (bin/seed.rs)│   │
//! │   │               │     │               │    │              │   │
//! │   │ load / save   │     │ products CSV  │    │ default data │   │
//! │   │ backup        │     │ sales CSV     │    │ for dev      │   │
//! │   │ restore       │     │               │    │              │   │
//! │   └───────┬───────┘     └───────────────┘    └──────────────┘   │
//! │           │                                                      │
//! │           ▼                                                      │
//! │   one JSON document: ./data/caja.json                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Atomic snapshot load/save plus backup and restore
//! - [`export`] - CSV projections (pure strings, no file I/O)
//! - [`error`] - Storage error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod export;
pub mod store;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use store::FileStore;

/// Default snapshot file location, relative to the working directory.
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/caja.json";
