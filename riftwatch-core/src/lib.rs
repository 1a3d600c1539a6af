//! # riftwatch-core
//!
//! Core library for riftwatch - a live lobby companion for a MOBA game
//! client, driven by a companion backend.
//!
//! This library provides:
//! - Status classification and the connection gate for privileged actions
//! - Concurrent match-history lookups and per-player aggregation
//! - Session state, transient notifications and a pure view model
//! - The backend HTTP client and the Socket.IO push channel
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Everything visible lives in one [`SessionState`](session::SessionState).
//! Push events are routed into it by [`PushEventRouter`](router::PushEventRouter);
//! background work (history lookups, notification timers) reports back over a
//! [`SessionUpdate`](session::SessionUpdate) channel that the event loop drains.
//!
//! ## Example
//!
//! ```rust,no_run
//! use riftwatch_core::{backend::BackendClient, Config};
//!
//! # async fn demo() -> riftwatch_core::Result<()> {
//! let config = Config::load()?;
//! let client = BackendClient::new(config.backend.clone())?;
//! let detected = client.autodetect().await?;
//! println!("client detected: {}", detected.success);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use router::{PushCommand, PushEvent, PushEventRouter};
pub use session::{SessionState, SessionUpdate};
pub use types::*;

// Public modules
pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod gate;
pub mod logging;
pub mod lookup;
pub mod notify;
pub mod push;
pub mod router;
pub mod session;
pub mod stats;
pub mod types;
pub mod view;
