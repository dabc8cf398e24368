//! Client context and lifecycle.
//!
//! [`LocalizationClient`] replaces process-wide state: it owns the cache
//! handle, the request pool, the coalescer daemon and the resolver for one
//! override collection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    LocalizationClient                        │
//! │                                                              │
//! │  start():                                                    │
//! │    batch endpoint + cache opened ──► FetchMode::Batched      │
//! │       └── RequestCoalescer daemon (CancellationToken child)  │
//! │    otherwise ─────────────────────► FetchMode::Direct        │
//! │                                                              │
//! │  ResourcePool ◄── LanguageResolver ◄── get_localize_resources│
//! │                                                              │
//! │  shutdown(): cancel daemon, clear pool                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod context;

pub use config::ClientConfig;
pub use context::{FetchModeKind, LocalizationClient};
