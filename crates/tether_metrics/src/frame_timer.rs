//! Rolling timer for whole simulation steps

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Times `begin`/`end` spans (one per simulated frame) over a rolling window.
pub struct FrameTimer {
    frame_start: Instant,
    frame_times: RingBuffer<Duration>,
    total_frames: u64,
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        Self {
            frame_start: Instant::now(),
            frame_times: RingBuffer::new(window),
            total_frames: 0,
        }
    }

    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Close the current span and return its length in milliseconds.
    pub fn end(&mut self) -> f64 {
        let elapsed = self.frame_start.elapsed();
        self.frame_times.push(elapsed);
        self.total_frames += 1;
        elapsed.as_secs_f64() * 1000.0
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frames per second the measured work could sustain on its own.
    pub fn rate_hz(&self) -> f64 {
        let avg = self.frame_times.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn average_ms(&self) -> f64 {
        self.frame_times.average().as_secs_f64() * 1000.0
    }

    pub fn range_ms(&self) -> (f64, f64) {
        let (min, max) = self.frame_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_counted_and_averaged() {
        let mut timer = FrameTimer::new(4);
        for _ in 0..3 {
            timer.begin();
            std::thread::sleep(Duration::from_millis(1));
            assert!(timer.end() >= 1.0);
        }
        assert_eq!(timer.total_frames(), 3);
        let (min, max) = timer.range_ms();
        assert!(min <= timer.average_ms() && timer.average_ms() <= max);
        assert!(timer.rate_hz() > 0.0);
    }
}
