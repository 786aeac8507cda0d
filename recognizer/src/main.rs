//! Statistical ISA recognition CLI.
//!
//! Classifies the whole file, any text regions a recognized container
//! exposes, and (unless `--fast`) segments the file with a sliding
//! window.

use clap::{Parser, ValueEnum};
use isa_recognizer::{
    extract, Analyzer, FileReport, HumanFormatter, JsonFormatter, ReferenceIndex, RegionReport,
    ReportFormatter, ScanOptions, DEFAULT_WINDOW,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Statistical CPU architecture recognition for raw binaries.
///
/// Ranks every reference of a trained corpus by n-gram divergence at
/// two orders, reports a label only when the orders agree, and locates
/// the code-carrying regions of a file with a sliding window.
#[derive(Parser, Debug)]
#[command(name = "isa-recognize")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Corpus directory with <Label>.corpus[.xz] entries
    #[arg(short, long, env = "ISA_CORPUS", default_value = "corpus")]
    corpus: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Skip the sliding-window scan (whole-file and text-section only)
    #[arg(long)]
    fast: bool,

    /// Window size in bytes for the sliding scan
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Step between window starts (defaults to the window size)
    #[arg(long)]
    step: Option<usize>,

    /// Noise threshold for run absorption (defaults to the window size)
    #[arg(long)]
    noise: Option<usize>,

    /// Verbose output (repeat for per-window detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (one line per file)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable report
    Human,
    /// JSON document per file
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose > 0 {
        let filter = if args.verbose > 1 {
            "isa_recognizer=debug"
        } else {
            "isa_recognizer=info"
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let index = match ReferenceIndex::load(&args.corpus) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let analyzer = Analyzer::with_options(index, scan_options(&args));
    let formatter = formatter_for(&args);

    let mut success = true;
    for path in &args.files {
        match analyze_file(&analyzer, path, args.fast) {
            Ok(report) => print!("{}", formatter.format_report(&report)),
            Err(e) => {
                eprintln!("error analyzing {}: {}", path.display(), e);
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn scan_options(args: &Args) -> ScanOptions {
    ScanOptions::default()
        .with_window(args.window)
        .with_step(args.step.unwrap_or(args.window))
        .with_noise_threshold(args.noise.unwrap_or(args.window))
}

fn formatter_for(args: &Args) -> Box<dyn ReportFormatter> {
    match args.format {
        OutputFormat::Human if args.quiet => Box::new(HumanFormatter::quiet()),
        OutputFormat::Human if args.verbose > 0 => Box::new(HumanFormatter::verbose()),
        OutputFormat::Human => Box::new(HumanFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
    }
}

/// Analyze one file: whole-file verdict, container text regions, and
/// the sliding-window segmentation unless fast mode is on.
fn analyze_file(
    analyzer: &Analyzer,
    path: &PathBuf,
    fast: bool,
) -> isa_recognizer::Result<FileReport> {
    let data = std::fs::read(path)?;

    let regions = extract::text_regions(&data)
        .unwrap_or_default()
        .into_iter()
        .map(|region| {
            let slice = &data[region.offset..region.offset + region.len];
            RegionReport {
                kind: region.kind,
                offset: region.offset,
                len: region.len,
                verdict: analyzer.deduce(slice),
            }
        })
        .collect();

    Ok(FileReport {
        path: path.display().to_string(),
        file_len: data.len(),
        whole_file: analyzer.deduce(&data),
        regions,
        segmentation: (!fast).then(|| analyzer.scan(&data)),
    })
}
