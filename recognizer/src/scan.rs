//! Sliding-window scanning of a whole file.
//!
//! Windows are placed at multiples of the step until the last window
//! that fully fits; when a tail remains, one extra window is pinned to
//! the end of the file so coverage is complete even when the step does
//! not divide the file length. Each window is classified independently
//! against the shared index and annotated with its normalized byte
//! entropy.

use crate::classify::{deduce, Verdict};
use crate::corpus::ReferenceIndex;
use crate::entropy::shannon;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default window size. The engine is calibrated for this value with a
/// step of one window (non-overlapping). Smaller windows lose
/// statistical power, larger ones lose spatial resolution.
pub const DEFAULT_WINDOW: usize = 0x1000;

/// Smallest block worth classifying on its own. Files shorter than this
/// are classified as a single window.
pub const MIN_WINDOW: usize = 0x80;

/// Tunables for the scanner and the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Window size in bytes.
    pub window: usize,
    /// Distance between window starts. Equal to `window` for the
    /// calibrated non-overlapping scan; smaller values overlap.
    pub step: usize,
    /// Runs at or below this length are candidates for absorption by
    /// their neighbors during reconciliation.
    pub noise_threshold: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            step: DEFAULT_WINDOW,
            noise_threshold: DEFAULT_WINDOW,
        }
    }
}

impl ScanOptions {
    /// Calibrated non-overlapping scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Half-window overlap for finer boundary resolution.
    pub fn overlapping() -> Self {
        Self {
            step: DEFAULT_WINDOW / 2,
            ..Self::default()
        }
    }

    /// Set the window size, keeping step and noise threshold in lockstep.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self.step = window;
        self.noise_threshold = window;
        self
    }

    /// Set the step independently of the window.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Set the noise threshold independently.
    pub fn with_noise_threshold(mut self, noise_threshold: usize) -> Self {
        self.noise_threshold = noise_threshold;
        self
    }
}

/// One classified window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResult {
    /// Byte offset of the window in the file.
    pub offset: usize,
    /// Window length in bytes.
    pub len: usize,
    /// Classification of the window's bytes.
    pub verdict: Verdict,
    /// Normalized Shannon entropy of the window's bytes.
    pub entropy: f64,
}

/// Classify every window of `data`, in ascending offset order.
///
/// Empty input yields no windows. Input shorter than [`MIN_WINDOW`] is
/// classified as a single whole-file window, as is input shorter than
/// the configured window size.
pub fn scan_windows(index: &ReferenceIndex, data: &[u8], options: &ScanOptions) -> Vec<WindowResult> {
    let offsets = window_offsets(data.len(), options.window.max(1), options.step.max(1));
    let window = options.window.max(1);
    let mut results: Vec<WindowResult> = offsets
        .par_iter()
        .map(|&offset| {
            let len = window.min(data.len() - offset);
            let slice = &data[offset..offset + len];
            WindowResult {
                offset,
                len,
                verdict: deduce(index, slice),
                entropy: shannon(slice),
            }
        })
        .collect();
    results.sort_by_key(|w| w.offset);
    for w in &results {
        debug!(
            offset = w.offset,
            label = w.verdict.display_label(),
            entropy = w.entropy,
            "window classified"
        );
    }
    results
}

/// Window start offsets for a file of `len` bytes.
fn window_offsets(len: usize, window: usize, step: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if len < MIN_WINDOW || len <= window {
        return vec![0];
    }
    let mut offsets = Vec::with_capacity(len / step + 1);
    let mut offset = 0;
    while offset + window <= len {
        offsets.push(offset);
        offset += step;
    }
    // Pin a final window to the end of the file when the step left a
    // tail uncovered.
    let last_end = offsets.last().map_or(0, |&o| o + window);
    if last_end < len {
        offsets.push(len - window);
    }
    offsets
}
