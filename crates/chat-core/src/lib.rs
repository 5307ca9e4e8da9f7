//! Chat core: everything that holds or changes conversation state.
//!
//! Platform adapters plug in through the traits in [`ports`]; this crate
//! never touches the browser directly.

pub mod ports;
pub mod event_bus;
pub mod store;
pub mod merger;
pub mod uploader;
pub mod session;
