use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics_lock_poisoned_recovered");
    }
}

/// Loop and scene figures averaged over one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Fixed ticks discarded because a frame needed more than the per-frame cap.
    pub dropped_ticks: u32,
    pub node_count: usize,
    pub animation_count: usize,
}

/// Shared read side of the loop metrics. Cloning shares the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    dropped_ticks: u32,
    frame_time_sum: Duration,
    node_count: usize,
    animation_count: usize,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            dropped_ticks: 0,
            frame_time_sum: Duration::ZERO,
            node_count: 0,
            animation_count: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_ticks(&mut self, executed: u32, dropped: u32) {
        self.ticks = self.ticks.saturating_add(executed);
        self.dropped_ticks = self.dropped_ticks.saturating_add(dropped);
    }

    /// Latest scene size; the snapshot reports the last recorded value.
    pub(crate) fn record_scene(&mut self, node_count: usize, animation_count: usize) {
        self.node_count = node_count;
        self.animation_count = animation_count;
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            dropped_ticks: self.dropped_ticks,
            node_count: self.node_count,
            animation_count: self.animation_count,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.dropped_ticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison(handle: &MetricsHandle) {
        let lock = handle.snapshot.as_ref();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn interval_snapshot_averages_frames_and_ticks() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(20));
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.record_ticks(5, 0);
        accumulator.record_ticks(5, 3);
        accumulator.record_scene(48, 2);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("snapshot");
        assert!((snapshot.fps - 1.0).abs() < 0.01);
        assert!((snapshot.tps - 5.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 15.0).abs() < 0.001);
        assert_eq!(snapshot.dropped_ticks, 3);
        assert_eq!(snapshot.node_count, 48);
        assert_eq!(snapshot.animation_count, 2);
    }

    #[test]
    fn counters_reset_after_each_snapshot_but_scene_size_persists() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_millis(250), base);
        accumulator.record_ticks(15, 1);
        accumulator.record_scene(10, 0);
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(100))
            .is_none());
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(250))
            .is_some());

        let next = accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .expect("second snapshot");
        assert_eq!(next.tps, 0.0);
        assert_eq!(next.dropped_ticks, 0);
        assert_eq!(next.node_count, 10);
    }

    #[test]
    fn poisoned_lock_still_reads_and_publishes() {
        let handle = MetricsHandle::default();
        poison(&handle);
        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());

        let expected = LoopMetricsSnapshot {
            fps: 30.0,
            tps: 60.0,
            frame_time_ms: 33.0,
            dropped_ticks: 0,
            node_count: 7,
            animation_count: 1,
        };
        handle.publish(expected);
        assert_eq!(handle.clone().snapshot(), expected);
    }
}
