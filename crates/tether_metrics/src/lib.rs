//! Tether Metrics - Common utilities for performance tracking
//!
//! Provides zero-cost abstractions for timing collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tether_metrics::{FrameTimer, Stopwatch};
//!
//! let watch = Stopwatch::start();
//! // ... do work ...
//! let solve_ms = watch.elapsed_ms();
//!
//! let mut timer = FrameTimer::new(60); // Track last 60 frames
//! timer.begin();
//! // ... step the simulation ...
//! timer.end();
//! println!("step: {:.3} ms", timer.average_ms());
//! ```
//!
//! In production builds (without `metrics` feature), every reading is zero
//! and no clock is ever sampled.

#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod stopwatch;

#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use stopwatch::Stopwatch;

/// Whether this build samples real clocks.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch;

#[cfg(not(feature = "metrics"))]
impl Stopwatch {
    #[inline]
    pub fn start() -> Self { Self }
    #[inline]
    pub fn elapsed_ms(&self) -> f32 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) -> f64 { 0.0 }
    pub fn total_frames(&self) -> u64 { 0 }
    pub fn rate_hz(&self) -> f64 { 0.0 }
    pub fn average_ms(&self) -> f64 { 0.0 }
    pub fn range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
impl RingBuffer<f32> {
    pub fn average(&self) -> f32 { 0.0 }
}
