//! Scene module - render scheduling and frame output
//!
//! - Dirty-flag scheduler with a single render thread
//! - Bloom and ACES tone mapping
//! - Published RGB frames and per-pass events

mod frame;
mod postprocess;
mod scheduler;

pub use frame::*;
pub use postprocess::*;
pub use scheduler::*;
