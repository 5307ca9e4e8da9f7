//! egui UI for the chat client.
//!
//! Panels render from [`state::UiState`] and hand user intent back to the
//! app as action enums; they never call the core themselves.

pub mod panels;
pub mod state;
pub mod theme;
