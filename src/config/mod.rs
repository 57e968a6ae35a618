//! Configuration management for the cube-arena service
//!
//! This module handles configuration loading from an optional TOML file and
//! environment variables, validation, and default values for the match service.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, AuthSettings, MatchSettings, ServerSettings, ServiceSettings,
};
pub use rating::RatingSettings;
