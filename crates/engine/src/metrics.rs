use std::time::{Duration, Instant};

/// Rates over the last metrics interval, published to the log by the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub sps: f32,
    pub frame_time_ms: f32,
    pub worst_frame_ms: f32,
}

/// Counters for one interval; closing a window drains it.
#[derive(Debug, Default)]
struct Window {
    frames: u32,
    steps: u32,
    frame_time_sum: Duration,
    worst_frame: Duration,
}

impl Window {
    fn close(&mut self, elapsed: Duration) -> LoopMetricsSnapshot {
        let window = std::mem::take(self);
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if window.frames == 0 {
            0.0
        } else {
            window.frame_time_sum.as_secs_f32() * 1000.0 / window.frames as f32
        };
        LoopMetricsSnapshot {
            fps: window.frames as f32 / seconds,
            sps: window.steps as f32 / seconds,
            frame_time_ms,
            worst_frame_ms: window.worst_frame.as_secs_f32() * 1000.0,
        }
    }
}

/// Counts frames and simulation steps between snapshots.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    interval: Duration,
    window: Window,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            interval,
            window: Window::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.window.frames = self.window.frames.saturating_add(1);
        self.window.frame_time_sum = self.window.frame_time_sum.saturating_add(frame_dt);
        self.window.worst_frame = self.window.worst_frame.max(frame_dt);
    }

    pub(crate) fn record_step(&mut self) {
        self.window.steps = self.window.steps.saturating_add(1);
    }

    /// Emits a snapshot once per interval and starts the next window.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }
        self.window_start = now;
        Some(self.window.close(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_the_window() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(2));
        let base = Instant::now();

        for millis in [10, 20, 30] {
            accumulator.record_frame(Duration::from_millis(millis));
        }
        for _ in 0..6 {
            accumulator.record_step();
        }

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 1.5).abs() < 0.05);
        assert!((snapshot.sps - 3.0).abs() < 0.1);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert!((snapshot.worst_frame_ms - 30.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn closing_a_window_resets_the_counters() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_millis(10));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(50));
        accumulator.record_step();

        accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("first snapshot");

        let second = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second snapshot");
        assert_eq!(second.frame_time_ms, 0.0);
        assert_eq!(second.worst_frame_ms, 0.0);
        assert_eq!(second.fps, 0.0);
    }
}
