//! Deterministic time system
//!
//! Fixed 60Hz tick rate; wall-clock frame time is accumulated and drained in
//! whole ticks so the simulation always advances by the same `dt`.

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Upper bound on ticks drained per frame so a long stall cannot spiral.
pub const MAX_TICKS_PER_FRAME: u32 = 8;

/// Simulation time tracker
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
    pending: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
            pending: Duration::ZERO,
        }
    }

    /// Fixed step in seconds, as passed to the solver.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / TICK_RATE_HZ as f32
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += TICK_DURATION;
    }

    /// Feed elapsed wall-clock time and return how many fixed ticks are due.
    /// Time beyond [`MAX_TICKS_PER_FRAME`] ticks is dropped.
    pub fn accumulate(&mut self, frame_time: Duration) -> u32 {
        self.pending += frame_time;
        let mut due = 0;
        while self.pending >= TICK_DURATION && due < MAX_TICKS_PER_FRAME {
            self.pending -= TICK_DURATION;
            due += 1;
        }
        if due == MAX_TICKS_PER_FRAME {
            self.pending = Duration::ZERO;
        }
        due
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
