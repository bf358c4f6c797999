//! Scoped phase timing

use std::time::Instant;

/// Measures one phase of work; read it once the phase is done.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    #[inline]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds since [`Stopwatch::start`].
    #[inline]
    pub fn elapsed_ms(&self) -> f32 {
        self.started.elapsed().as_secs_f32() * 1000.0
    }
}
