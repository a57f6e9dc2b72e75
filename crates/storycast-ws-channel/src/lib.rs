//! Storycast — WebSocket event channel.
//!
//! Connects a presentation client to the relay's `/ws` endpoint and keeps
//! reconnecting with backoff. Transport state surfaces as
//! [`ChannelSignal::Connected`](storycast_core::channel::ChannelSignal) and
//! `Disconnected` so the sync layer can resync after a drop.

pub mod config;
pub mod ws_channel;

pub use config::WsChannelConfig;
pub use ws_channel::WsChannel;
