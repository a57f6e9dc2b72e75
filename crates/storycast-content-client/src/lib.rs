//! Storycast — HTTP content service client.
//!
//! Implements [`storycast_core::content::ContentService`] over the content
//! service's REST API with `reqwest`.

pub mod config;
pub mod http_content_service;

pub use config::ContentClientConfig;
pub use http_content_service::HttpContentService;
