//! Use-case services.
//!
//! # Responsibility
//! - Wire location, provider, settings and notifier into the refresh flow.
//! - Keep FFI and UI layers free of sequencing and filtering rules.

pub mod bird_watch;
mod refresh;

pub use refresh::{FetchTicket, RefreshPolicy};
