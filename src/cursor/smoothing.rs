//! Bounded moving-average filter
//!
//! Low-pass filter over the most recent 2D samples of a single stream.
//! Every sample carries equal weight; there is no outlier rejection.
//!
//! ```text
//! value = (1/n) * Σ samples[i]      n = min(pushed, bound)
//! ```
//!
//! Gyro-derived and pointer-derived positions are filtered by separate
//! windows so the two streams never contaminate each other.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Default number of samples averaged by a window
pub const DEFAULT_WINDOW: usize = 8;

/// Configuration for smoothing windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Number of samples kept per stream
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

/// FIFO window publishing the arithmetic mean of its samples
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<Vec2>,
    bound: usize,
    sum: Vec2,
}

impl SmoothingWindow {
    /// Create a window averaging at most `bound` samples
    pub fn new(bound: usize) -> Self {
        assert!(bound > 0, "smoothing window bound must be non-zero");
        Self {
            samples: VecDeque::with_capacity(bound + 1),
            bound,
            sum: Vec2::ZERO,
        }
    }

    /// Append a sample, evicting the oldest once the bound is exceeded
    pub fn push(&mut self, point: Vec2) {
        self.samples.push_back(point);

        while self.samples.len() > self.bound {
            self.samples.pop_front();
        }

        // Recomputed rather than maintained incrementally so float error
        // does not accumulate over long sessions.
        self.sum = self.samples.iter().copied().sum();

        trace!(
            "Smoothing push: ({:.4}, {:.4}), held={}",
            point.x,
            point.y,
            self.samples.len()
        );
    }

    /// Mean of all held samples
    ///
    /// # Panics
    ///
    /// Panics if no sample has been pushed since creation or the last
    /// [`clear`](Self::clear). Querying an empty window means the pipeline
    /// published before any data arrived.
    pub fn value(&self) -> Vec2 {
        assert!(
            !self.samples.is_empty(),
            "SmoothingWindow::value() called on an empty window"
        );
        self.sum / self.samples.len() as f32
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = Vec2::ZERO;
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no sample is held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples averaged
    pub fn bound(&self) -> usize {
        self.bound
    }
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
