//! Storycast Core — shared abstractions.
//!
//! This crate defines the data model, wire messages, error taxonomy and
//! collaborator traits that the graph and presentation crates depend on.
//! It contains no HTTP or socket code.

pub mod channel;
pub mod clock;
pub mod content;
pub mod display;
pub mod error;
pub mod event;
pub mod ids;
pub mod node;
