//! Flutter bridge for the BirdSpot core.

pub mod api;
mod notifications;
