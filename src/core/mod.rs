//! Platform-neutral types: geometry, options, entities and styles

pub mod camera;
pub mod config;
pub mod geo;
pub mod listener;
pub mod marker;
pub mod style;
