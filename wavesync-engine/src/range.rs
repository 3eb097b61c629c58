//! Smoothed intensity range for mapping dB to colour.

use std::collections::VecDeque;

use wavesync_messages::Decibels;

use crate::config::SurfaceRangeConfig;

/// Time-ordered samples of one quantity, pruned by age on every insert.
#[derive(Debug, Clone)]
pub struct RangeHistory {
    window_ms: f64,
    samples: VecDeque<(f32, f64)>,
}

impl RangeHistory {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: f32, now_ms: f64) {
        self.samples.push_back((value, now_ms));
        let oldest_kept = now_ms - self.window_ms;
        while let Some(&(_, at)) = self.samples.front() {
            if at >= oldest_kept {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Mean of the retained samples. A single spike moves it by at most
    /// `spike / len()`.
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|&(v, _)| f64::from(v)).sum();
        Some((sum / self.samples.len() as f64) as f32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Min and max over the finite bins of a frame.
pub fn finite_extent(magnitudes: &[f32]) -> Option<(f32, f32)> {
    magnitudes
        .iter()
        .copied()
        .filter(|m| m.is_finite())
        .fold(None, |extent, m| match extent {
            None => Some((m, m)),
            Some((lo, hi)) => Some((lo.min(m), hi.max(m))),
        })
}

/// Floor and ceiling tracker for one rendering surface.
///
/// The floor follows a short window so it reacts to band changes; the
/// ceiling follows a long one so periodic bursts do not make the display
/// pump.
#[derive(Debug, Clone)]
pub struct AutoRange {
    floor: RangeHistory,
    ceiling: RangeHistory,
    floor_margin_db: f32,
    ceiling_margin_db: f32,
}

impl AutoRange {
    pub fn new(config: &SurfaceRangeConfig) -> Self {
        Self {
            floor: RangeHistory::new(config.floor_window_ms),
            ceiling: RangeHistory::new(config.ceiling_window_ms),
            floor_margin_db: config.floor_margin_db,
            ceiling_margin_db: config.ceiling_margin_db,
        }
    }

    /// Feed one released frame. Frames without a finite bin are ignored.
    pub fn observe(&mut self, magnitudes: &[f32], now_ms: f64) -> bool {
        let Some((lo, hi)) = finite_extent(magnitudes) else {
            return false;
        };
        self.floor.push(lo, now_ms);
        self.ceiling.push(hi, now_ms);
        true
    }

    /// Current `(floor, ceiling)` including margins.
    pub fn display_range(&self) -> Option<(Decibels, Decibels)> {
        let floor = self.floor.mean()? - self.floor_margin_db;
        let ceiling = self.ceiling.mean()? + self.ceiling_margin_db;
        Some((Decibels(floor), Decibels(ceiling)))
    }

    pub fn ceiling_history(&self) -> &RangeHistory {
        &self.ceiling
    }

    pub fn floor_history(&self) -> &RangeHistory {
        &self.floor
    }

    pub fn reset(&mut self) {
        self.floor.clear();
        self.ceiling.clear();
    }
}
