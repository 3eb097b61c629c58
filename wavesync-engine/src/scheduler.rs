//! Frame queue paced against the audio clock.

use std::collections::VecDeque;

use log::{debug, trace};
use wavesync_messages::{SchedulerStats, SpectrumFrame, SyncMode};

use crate::config::SchedulerConfig;

/// Bounded FIFO of spectrum frames waiting for their moment on screen.
///
/// Frames leave in arrival order or not at all: the queue drops from the
/// front under backpressure and for age, but never reorders.
pub struct FrameScheduler {
    queue: VecDeque<SpectrumFrame>,
    mode: SyncMode,
    healthy_depth: usize,
    max_frame_age_ms: f64,
    safety_margin_ms: f64,
    filter_latency_ms: f64,
    next_order: u64,
    stats: SchedulerStats,
}

impl FrameScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            queue: VecDeque::with_capacity(config.healthy_depth + 1),
            mode: config.mode,
            healthy_depth: config.healthy_depth.max(1),
            max_frame_age_ms: config.max_frame_age_ms,
            safety_margin_ms: config.safety_margin_ms,
            filter_latency_ms: config.filter_latency_ms,
            next_order: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Applies from the next tick on.
    pub fn set_mode(&mut self, mode: SyncMode) {
        if self.mode != mode {
            debug!("Sync mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn filter_latency_ms(&self) -> f64 {
        self.filter_latency_ms
    }

    /// Cache the filter-path latency used by every deadline.
    pub fn set_filter_latency(&mut self, latency_ms: f64) {
        self.filter_latency_ms = latency_ms;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queue_depth: self.queue.len(),
            ..self.stats
        }
    }

    /// Forget every queued frame without counting them as drops.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Queue a frame. Returns its receive order.
    pub fn enqueue(
        &mut self,
        magnitudes: Vec<f32>,
        server_timestamp_ms: f64,
        center_frequency: f64,
        now_ms: f64,
    ) -> u64 {
        let receive_order = self.next_order;
        self.next_order += 1;
        self.stats.enqueued += 1;
        self.queue.push_back(SpectrumFrame {
            magnitudes,
            server_timestamp_ms,
            received_at_ms: now_ms,
            receive_order,
            center_frequency,
        });

        let excess = self.queue.len().saturating_sub(self.healthy_depth);
        if excess > 0 {
            self.queue.drain(..excess);
            self.stats.dropped_backpressure += excess as u64;
            trace!("Backpressure dropped {excess} frames");
        }
        receive_order
    }

    /// When a synchronized frame is due on screen.
    pub fn deadline(&self, frame: &SpectrumFrame, buffered_ahead_ms: f64) -> f64 {
        frame.server_timestamp_ms - buffered_ahead_ms + self.filter_latency_ms
            - self.safety_margin_ms
    }

    /// Release whatever is due at `now_ms`.
    pub fn tick(&mut self, now_ms: f64, buffered_ahead_ms: f64) -> Vec<SpectrumFrame> {
        self.drop_stale(now_ms);

        let released = match self.mode {
            SyncMode::Synchronized => self.release_due(now_ms, buffered_ahead_ms),
            SyncMode::FreeRunning => self.release_latest(),
        };
        self.stats.released += released.len() as u64;
        released
    }

    fn drop_stale(&mut self, now_ms: f64) {
        let before = self.queue.len();
        let max_age = self.max_frame_age_ms;
        self.queue
            .retain(|frame| now_ms - frame.received_at_ms <= max_age);
        let stale = before - self.queue.len();
        if stale > 0 {
            self.stats.dropped_stale += stale as u64;
            trace!("Dropped {stale} stale frames");
        }
    }

    fn release_due(&mut self, now_ms: f64, buffered_ahead_ms: f64) -> Vec<SpectrumFrame> {
        let mut due = Vec::new();
        while let Some(front) = self.queue.front() {
            if now_ms < self.deadline(front, buffered_ahead_ms) {
                break;
            }
            if let Some(frame) = self.queue.pop_front() {
                due.push(frame);
            }
        }
        due
    }

    fn release_latest(&mut self) -> Vec<SpectrumFrame> {
        let Some(latest) = self.queue.pop_back() else {
            return Vec::new();
        };
        self.stats.superseded += self.queue.len() as u64;
        self.queue.clear();
        vec![latest]
    }
}
