//! Pure graph types and traversal.

pub mod paths;
pub mod snapshot;
