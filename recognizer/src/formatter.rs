//! Output formatters for file reports.
//!
//! A [`FileReport`] bundles everything the CLI learned about one input:
//! the whole-file verdict, verdicts for any extracted text regions, and
//! the sliding-window segmentation. Formatters render it for humans or
//! as JSON.

use crate::classify::Verdict;
use crate::segment::Segmentation;
use serde::{Deserialize, Serialize};

/// Verdict for one extracted container region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionReport {
    /// Region provenance, e.g. `ELF .text`.
    pub kind: String,
    /// Byte offset of the region.
    pub offset: usize,
    /// Region length.
    pub len: usize,
    /// Classification of the region's bytes.
    pub verdict: Verdict,
}

/// Complete analysis results for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Input path as given.
    pub path: String,
    /// Input length in bytes.
    pub file_len: usize,
    /// Whole-file classification.
    pub whole_file: Verdict,
    /// Per-region classifications when a container was recognized.
    pub regions: Vec<RegionReport>,
    /// Sliding-window segmentation; absent in fast mode.
    pub segmentation: Option<Segmentation>,
}

/// Trait for rendering a [`FileReport`].
pub trait ReportFormatter {
    /// Render the complete report, including a trailing newline.
    fn format_report(&self, report: &FileReport) -> String;
}

/// Human-readable output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Also print the top-ranked candidates of each order.
    pub verbose: bool,
    /// Print a single `path: label` line.
    pub quiet: bool,
}

impl HumanFormatter {
    /// Default human formatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verbose formatter with per-order rankings.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            quiet: false,
        }
    }

    /// One line per file.
    pub fn quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }

    fn format_rankings(verdict: &Verdict, indent: &str) -> String {
        let mut s = String::new();
        for ranking in [&verdict.order2, &verdict.order3] {
            let entries: Vec<String> = ranking
                .top(3)
                .iter()
                .map(|score| format!("{} {:.4}", score.label, score.divergence))
                .collect();
            s.push_str(&format!(
                "{indent}{:>9}: {}\n",
                ranking.order().to_string(),
                entries.join(", ")
            ));
        }
        s
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_report(&self, report: &FileReport) -> String {
        if self.quiet {
            return format!("{}: {}\n", report.path, report.whole_file.display_label());
        }

        let mut s = format!("File: {} ({:#x} bytes)\n", report.path, report.file_len);
        s.push_str(&format!(
            "  Whole file: {}\n",
            report.whole_file.display_label()
        ));
        if self.verbose {
            s.push_str(&Self::format_rankings(&report.whole_file, "    "));
        }

        for region in &report.regions {
            s.push_str(&format!(
                "  {} (offset={:#x}, size={:#x}): {}\n",
                region.kind,
                region.offset,
                region.len,
                region.verdict.display_label()
            ));
            if self.verbose {
                s.push_str(&Self::format_rankings(&region.verdict, "    "));
            }
        }

        if let Some(segmentation) = &report.segmentation {
            s.push_str("  Segmentation:\n");
            for run in segmentation.runs() {
                s.push_str(&format!(
                    "    {:<11} {:<11} {} (size={:#x}, entropy={:.6})",
                    run.offset,
                    format!("{:#x}", run.offset),
                    run.display_label(),
                    run.len,
                    run.entropy
                ));
                if run.high_entropy {
                    s.push_str("  [high-entropy]");
                }
                s.push('\n');
            }
        }
        s
    }
}

/// JSON output.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print the document.
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Pretty-printing JSON formatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_report(&self, report: &FileReport) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        match rendered {
            Ok(mut s) => {
                s.push('\n');
                s
            }
            Err(e) => format!("{{\"error\": \"{e}\"}}\n"),
        }
    }
}
