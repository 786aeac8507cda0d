//! Segmentation reconciliation.
//!
//! Window verdicts come in offset order, possibly overlapping. The
//! reconciler resolves overlaps, coalesces same-label neighbors into
//! runs, absorbs short noise runs sandwiched between agreeing neighbors,
//! and annotates every final run with its byte entropy. The output is
//! total: gapless, non-overlapping, and covering the whole input, with
//! NONE runs wherever nothing survived.

use crate::entropy::shannon;
use crate::scan::WindowResult;
use serde::{Deserialize, Serialize};

/// Runs at or above this normalized entropy are flagged as likely
/// encrypted or compressed; their labels should be discounted.
pub const HIGH_ENTROPY_THRESHOLD: f64 = 0.9;

/// One labeled region of the final segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Byte offset of the run.
    pub offset: usize,
    /// Run length in bytes.
    pub len: usize,
    /// Architecture label, or `None`.
    pub label: Option<String>,
    /// Normalized Shannon entropy of the run's bytes.
    pub entropy: f64,
    /// True when `entropy >= HIGH_ENTROPY_THRESHOLD`.
    pub high_entropy: bool,
}

impl Run {
    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The label, or the literal token `None` for display.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("None")
    }
}

/// Gapless, non-overlapping labeled cover of a whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segmentation {
    runs: Vec<Run>,
    total_len: usize,
}

impl Segmentation {
    /// The runs, in ascending offset order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Length of the segmented input.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// True for zero-length input.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The label of the longest labeled run, if any.
    ///
    /// This is the file-level "best guess" when the whole-file verdict
    /// is inconclusive.
    pub fn dominant_label(&self) -> Option<&str> {
        self.runs
            .iter()
            .filter(|r| r.label.is_some())
            .max_by_key(|r| r.len)
            .and_then(|r| r.label.as_deref())
    }
}

/// Working interval before entropy annotation.
#[derive(Debug, Clone)]
struct Interval {
    start: usize,
    end: usize,
    label: Option<String>,
    confident: bool,
}

/// Reconcile classified windows into a total segmentation of `data`.
///
/// `noise_threshold` bounds the runs eligible for absorption; the
/// calibrated default is one window size.
pub fn reconcile(data: &[u8], windows: &[WindowResult], noise_threshold: usize) -> Segmentation {
    if data.is_empty() {
        return Segmentation {
            runs: Vec::new(),
            total_len: 0,
        };
    }

    let mut intervals = disjoint_intervals(data.len(), windows);
    coalesce(&mut intervals);
    absorb_noise(&mut intervals, noise_threshold);

    let runs = intervals
        .into_iter()
        .map(|iv| {
            let entropy = shannon(&data[iv.start..iv.end]);
            Run {
                offset: iv.start,
                len: iv.end - iv.start,
                label: iv.label,
                entropy,
                high_entropy: entropy >= HIGH_ENTROPY_THRESHOLD,
            }
        })
        .collect();
    Segmentation {
        runs,
        total_len: data.len(),
    }
}

/// Turn possibly-overlapping windows into a gapless disjoint cover of
/// `[0, len)`.
///
/// An overlap goes to whichever side holds a confident verdict; when
/// both or neither do, the earlier window keeps it. Regions no window
/// covers become NONE intervals.
fn disjoint_intervals(len: usize, windows: &[WindowResult]) -> Vec<Interval> {
    let mut intervals: Vec<Interval> = Vec::new();
    let mut covered = 0usize;
    for w in windows {
        let end = (w.offset + w.len).min(len);
        let mut start = w.offset.min(end);
        if start > covered {
            // Gap left by a step larger than the window.
            intervals.push(Interval {
                start: covered,
                end: start,
                label: None,
                confident: false,
            });
        } else if start < covered {
            let take_overlap = end > covered
                && w.verdict.confident
                && intervals.last().is_some_and(|p| !p.confident);
            if take_overlap {
                // Hand the overlap to the confident side.
                if let Some(prev) = intervals.last_mut() {
                    prev.end = start;
                }
                if intervals.last().is_some_and(|p| p.end <= p.start) {
                    intervals.pop();
                }
            } else {
                start = covered;
            }
        }
        if end > start {
            intervals.push(Interval {
                start,
                end,
                label: w.verdict.label.clone(),
                confident: w.verdict.confident,
            });
            covered = end;
        }
        covered = covered.max(end);
    }
    if covered < len {
        intervals.push(Interval {
            start: covered,
            end: len,
            label: None,
            confident: false,
        });
    }
    intervals
}

/// Merge adjacent intervals sharing a label.
fn coalesce(intervals: &mut Vec<Interval>) {
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals.drain(..) {
        match merged.last_mut() {
            Some(prev) if prev.label == iv.label => {
                prev.end = iv.end;
                prev.confident |= iv.confident;
            }
            _ => merged.push(iv),
        }
    }
    *intervals = merged;
}

/// Absorb short runs sandwiched between agreeing neighbors, repeating
/// until nothing changes.
///
/// A labeled run no longer than the threshold vanishes into two
/// same-label flanks that are each at least threshold long; a NONE run
/// strictly shorter than the threshold vanishes into matching non-NONE
/// flanks regardless of their length.
fn absorb_noise(intervals: &mut Vec<Interval>, noise_threshold: usize) {
    loop {
        let mut absorbed_at = None;
        for i in 1..intervals.len().saturating_sub(1) {
            let (prev, cur, next) = (&intervals[i - 1], &intervals[i], &intervals[i + 1]);
            if prev.label != next.label {
                continue;
            }
            let cur_len = cur.end - cur.start;
            let flanks_long = (prev.end - prev.start) >= noise_threshold
                && (next.end - next.start) >= noise_threshold;
            let absorb = if cur.label.is_none() && prev.label.is_some() {
                cur_len < noise_threshold
            } else {
                cur.label != prev.label && cur_len <= noise_threshold && flanks_long
            };
            if absorb {
                absorbed_at = Some(i);
                break;
            }
        }
        match absorbed_at {
            Some(i) => {
                let next = intervals.remove(i + 1);
                intervals.remove(i);
                let prev = &mut intervals[i - 1];
                prev.end = next.end;
                prev.confident |= next.confident;
            }
            None => break,
        }
    }
}
