//! Scanline: a z-buffered software rasterizer
//!
//! - Orbit camera and projection pipeline
//! - Scanline polygon fill with selectable shading models
//! - Dirty-flag frame scheduler with parallel rasterization
//! - ACES tone mapping and optional bloom

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod events;
pub mod logging;
pub mod mesh;
pub mod rasterizer;
pub mod scene;
