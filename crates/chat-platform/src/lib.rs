//! Browser platform adapters.
//!
//! Implements the `chat-core` ports on top of `fetch` (via gloo-net) and
//! the DOM file APIs. Only this crate and `chat-app` touch `web-sys`.

pub mod sse;
pub mod coze;
pub mod github;
pub mod file;
