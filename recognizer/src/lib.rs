//! Statistical CPU architecture recognition for raw binaries.
//!
//! This library identifies the instruction set architecture present in
//! an arbitrary binary blob by statistical similarity against a trained
//! reference corpus, and locates the contiguous regions of a file that
//! carry code for one of the known ISAs. It is aimed at firmware images
//! where no container metadata names the architecture and code may be
//! interleaved with data, padding, or resources for a different ISA.
//!
//! # How it works
//!
//! Byte bigram and trigram frequencies are turned into smoothed
//! probability profiles. An unknown blob is ranked against every
//! reference by Kullback-Leibler divergence at both orders
//! independently; only when the two orders agree on the nearest
//! reference is the label reported. A sliding window applies the same
//! classifier across a whole file, and a reconciliation pass merges the
//! window verdicts into a gapless labeled segmentation.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use isa_recognizer::{Analyzer, ReferenceIndex};
//!
//! fn main() -> isa_recognizer::Result<()> {
//!     let index = ReferenceIndex::load("corpus/")?;
//!     let analyzer = Analyzer::new(index);
//!
//!     let data = std::fs::read("firmware.bin")?;
//!     match analyzer.identify(&data) {
//!         Some(label) => println!("whole file: {label}"),
//!         None => println!("no confident whole-file match"),
//!     }
//!     for run in analyzer.scan(&data).runs() {
//!         println!("{:#x}+{:#x}: {}", run.offset, run.len, run.display_label());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Corpus layout
//!
//! A flat directory of `<Label>.corpus` files (optionally xz-compressed
//! as `<Label>.corpus.xz`) whose raw bytes are counted verbatim. Labels
//! starting with `_` train filler references for non-code data; they
//! rank but are never reported as a verdict.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]

pub mod classify;
pub mod corpus;
pub mod entropy;
pub mod error;
pub mod extract;
pub mod formatter;
pub mod ngram;
pub mod profile;
pub mod scan;
pub mod segment;

pub use classify::{deduce, rank, LabelScore, Ranking, Verdict};
pub use corpus::{
    IndexBuilder, Reference, ReferenceIndex, IA64_GATE_FRACTION, OCAML_GATE_FRACTION,
};
pub use error::{RecognizerError, Result};
pub use formatter::{FileReport, HumanFormatter, JsonFormatter, RegionReport, ReportFormatter};
pub use ngram::{NgramCounts, Order};
pub use profile::{kl_divergence, Profile, DEFAULT_ALPHA};
pub use scan::{scan_windows, ScanOptions, WindowResult, DEFAULT_WINDOW, MIN_WINDOW};
pub use segment::{reconcile, Run, Segmentation, HIGH_ENTROPY_THRESHOLD};

use std::path::Path;

/// A recognition session: a shared read-only reference index plus the
/// scan tunables.
///
/// Construction is eager; the first query carries no load cost. One
/// analyzer may serve any number of classifications, from any number of
/// threads.
#[derive(Debug, Clone)]
pub struct Analyzer {
    index: ReferenceIndex,
    options: ScanOptions,
}

impl Analyzer {
    /// Create an analyzer with the calibrated default scan options.
    pub fn new(index: ReferenceIndex) -> Self {
        Self::with_options(index, ScanOptions::default())
    }

    /// Create an analyzer with explicit scan options.
    pub fn with_options(index: ReferenceIndex, options: ScanOptions) -> Self {
        Self { index, options }
    }

    /// The reference index this session classifies against.
    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// The scan options in effect.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Whole-blob classification: the agreed label, or `None`.
    pub fn identify(&self, data: &[u8]) -> Option<String> {
        self.deduce(data).label
    }

    /// Whole-blob classification with full rankings for diagnostics.
    pub fn deduce(&self, data: &[u8]) -> Verdict {
        classify::deduce(&self.index, data)
    }

    /// Sliding-window scan and reconciliation into a gapless labeled
    /// segmentation of `data`.
    pub fn scan(&self, data: &[u8]) -> Segmentation {
        let windows = scan::scan_windows(&self.index, data, &self.options);
        segment::reconcile(data, &windows, self.options.noise_threshold)
    }

    /// [`identify`](Self::identify) for a file on disk.
    pub fn identify_file<P: AsRef<Path>>(&self, path: P) -> Result<Option<String>> {
        let data = std::fs::read(path)?;
        Ok(self.identify(&data))
    }

    /// [`scan`](Self::scan) for a file on disk.
    pub fn scan_file<P: AsRef<Path>>(&self, path: P) -> Result<Segmentation> {
        let data = std::fs::read(path)?;
        Ok(self.scan(&data))
    }
}

/// Library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
