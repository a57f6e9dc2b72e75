//! Shared test doubles for the Storycast presentation engine.

mod channel;
mod clock;
mod content;
mod display;

pub use channel::RecordingChannel;
pub use clock::{FixedClock, ManualClock};
pub use content::{InMemoryContentService, StoryGraph};
pub use display::RecordingDisplaySurface;
