//! Services coordinating the channel, the cache and the display surface.

pub mod bridge;
pub mod client;
pub mod controller;
pub mod navigator;
pub mod sync;
