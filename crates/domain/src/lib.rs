//! Shared types for every Palaver crate: the provider-agnostic message
//! model, model capabilities, configuration, errors, and trace events.

pub mod background;
pub mod capability;
pub mod config;
pub mod error;
pub mod text;
pub mod tool;
pub mod trace;
