//! Tether Engine Core
//!
//! Contains the fundamental building blocks shared by the simulation crates:
//! - Generational entity handles and sparse component storage
//! - Renderable transforms
//! - Deterministic time and math

pub mod ecs;
pub mod math;
pub mod time;
pub mod transform;

pub use glam;
pub use transform::Transform;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
