//! Presentation state and rules, free of I/O.

pub mod dedup;
pub mod history;
pub mod session;
pub mod state;
