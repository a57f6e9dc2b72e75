//! Storycast — story graph context.
//!
//! Responsible for caching fetched nodes, computing depth and forward paths
//! over the cached graph, and applying authoring edits through the content
//! service.

pub mod application;
pub mod domain;
