//! Stateful services over the content service.

pub mod cache;
pub mod editor;
pub mod path_engine;
