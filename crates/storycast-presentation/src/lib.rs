//! Storycast — live presentation context.
//!
//! Responsible for the presentation session lifecycle, host/follower
//! authority, reconciling local state with the real-time channel, and
//! driving the secondary display surface.

pub mod application;
pub mod domain;
