//! Push channel to the companion backend
//!
//! The backend speaks Socket.IO. We connect over a plain WebSocket, answer
//! the Engine.IO handshake and pings ourselves, and hand decoded events to
//! the session loop as [`ChannelEvent`]s. Commands flow the other way as
//! `42[...]` event frames.
//!
//! ```text
//! backend ──ws──► PushClient ──ChannelEvent──► PushEventRouter ──► SessionState
//!    ▲                │
//!    └── 42["cmd"] ◄──┘◄── PushCommand ◄── PushEventRouter::request
//! ```

mod client;
pub mod codec;

pub use client::{process_frame, socket_url, ChannelEvent, FrameAction, PushClient};
