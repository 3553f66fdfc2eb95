//! glitchscan - scan rendered audio for glitches
//!
//! Usage:
//!   glitchscan render.csv --frame-size 512 --include-boundaries
//!   glitchscan render.f32 --channels 2 --sample-rate 48000 --frequency 1000
//!   glitchscan output.wav --reference input.wav --window 4096 --output json
//!   glitchscan dump.csv --pair
//!
//! Exit code 0 = clean, 1 = glitches found, 2 = error

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use rf_glitch::{AnalysisConfig, GlitchAnalyzer, Report, SampleStream};
use rf_glitch_io::ingest::{self, ChannelResolver, InputFormat, LoadOptions};
use rf_glitch_io::render::{self, ReportFormat};

const DEFAULT_THRESHOLD: f64 = 0.1;
const DEFAULT_BOUNDARY_THRESHOLD: f64 = 0.01;

#[derive(Parser, Debug)]
#[command(name = "glitchscan", version, about = "Find discontinuities, seam glitches and phase slips in rendered audio")]
struct Cli {
    /// Stream to scan (CSV, raw f32 or WAV)
    input: PathBuf,

    /// Known-good input to compare the scanned stream against
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Input is one CSV with `input` and `output` columns
    #[arg(long, conflicts_with = "reference")]
    pair: bool,

    /// Input format; guessed from the extension when omitted
    #[arg(short, long)]
    format: Option<InputFormat>,

    /// Interleaved channel count for raw input
    #[arg(long, default_value_t = 2)]
    channels: usize,

    /// CSV columns to read as channels 0, 1, ...
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Sample rate in Hz (CSV / raw input; checked for WAV)
    #[arg(short, long)]
    sample_rate: Option<f64>,

    /// Only scan the first N seconds
    #[arg(long)]
    max_duration: Option<f64>,

    /// Discontinuity threshold (absolute amplitude)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Frame-seam threshold (absolute amplitude)
    #[arg(long)]
    boundary_threshold: Option<f64>,

    /// Processing buffer size the stream was rendered with
    #[arg(short = 'b', long)]
    frame_size: Option<usize>,

    /// Expected tone frequency in Hz; enables phase analysis
    #[arg(long)]
    frequency: Option<f64>,

    /// Inspect frame seams and tag discontinuities that sit on them
    #[arg(long)]
    include_boundaries: bool,

    /// Largest discontinuities kept per channel in the summary
    #[arg(long)]
    top_k: Option<usize>,

    /// Window size for windowed fidelity
    #[arg(short, long)]
    window: Option<usize>,

    /// JSON analysis config; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    output: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli) -> Result<Report> {
    let file_config = cli.config.as_deref().map(read_config).transpose()?;

    let load_options = load_options(cli, file_config.as_ref());
    let (stream, reference) = load_streams(cli, &load_options)?;

    let config = build_config(cli, file_config, stream.sample_rate());
    log::debug!("Analysis config: {:?}", config);

    let analyzer = GlitchAnalyzer::new(config);
    let report = match &reference {
        Some(reference) => analyzer.analyze_against(&stream, reference),
        None => analyzer.analyze(&stream),
    }
    .context("Analysis failed")?;

    let content = render::render(&report, cli.output).context("Failed to render report")?;
    match &cli.out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => print!("{}", content),
    }

    Ok(report)
}

fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn load_options(cli: &Cli, file_config: Option<&AnalysisConfig>) -> LoadOptions {
    let mut options = LoadOptions::default().with_channels(cli.channels);

    if let Some(format) = cli.format {
        options = options.with_format(format);
    }
    if let Some(rate) = cli.sample_rate.or(file_config.map(|c| c.sample_rate)) {
        options = options.with_sample_rate(rate);
    }
    if let Some(seconds) = cli.max_duration {
        options = options.with_max_duration(seconds);
    }
    if !cli.columns.is_empty() {
        options = options.with_resolver(ChannelResolver::explicit(cli.columns.iter().cloned()));
    }

    options
}

/// The stream to scan plus the optional reference
fn load_streams(
    cli: &Cli,
    options: &LoadOptions,
) -> Result<(SampleStream, Option<SampleStream>)> {
    let describe = |path: &Path| format!("Failed to load {}", path.display());

    if cli.pair {
        if matches!(options.format, Some(f) if f != InputFormat::Csv) {
            bail!("--pair needs CSV input");
        }
        let (reference, output) =
            ingest::load_pair_csv(&cli.input, options).with_context(|| describe(&cli.input))?;
        return Ok((output, Some(reference)));
    }

    let stream = ingest::load(&cli.input, options).with_context(|| describe(&cli.input))?;

    let reference = cli
        .reference
        .as_deref()
        .map(|path| {
            // the reference format is guessed from its own extension
            let options = LoadOptions {
                format: None,
                ..options.clone()
            };
            ingest::load(path, &options).with_context(|| describe(path))
        })
        .transpose()?;

    Ok((stream, reference))
}

fn build_config(cli: &Cli, file_config: Option<AnalysisConfig>, sample_rate: f64) -> AnalysisConfig {
    let mut config = file_config.unwrap_or_else(|| {
        AnalysisConfig::new(sample_rate, DEFAULT_THRESHOLD, DEFAULT_BOUNDARY_THRESHOLD)
    });

    // loading already reconciled any rate flag with the stream
    config.sample_rate = sample_rate;
    if let Some(threshold) = cli.threshold {
        config.discontinuity_threshold = threshold;
    }
    if let Some(threshold) = cli.boundary_threshold {
        config.boundary_threshold = threshold;
    }
    if let Some(frame_size) = cli.frame_size {
        config = config.with_frame_size(frame_size);
    }
    if let Some(frequency) = cli.frequency {
        config = config.with_expected_frequency(frequency);
    }
    if cli.include_boundaries {
        config = config.with_boundary_analysis();
    }
    if let Some(k) = cli.top_k {
        config = config.with_top_k(k);
    }
    if let Some(window) = cli.window {
        config = config.with_fidelity_window(window);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_full_scan() {
        let cli = Cli::try_parse_from([
            "glitchscan",
            "render.f32",
            "--format",
            "raw",
            "--channels",
            "1",
            "-s",
            "48000",
            "-b",
            "256",
            "--include-boundaries",
            "--frequency",
            "1000",
            "--output",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(InputFormat::Raw));
        assert_eq!(cli.channels, 1);
        assert_eq!(cli.output, ReportFormat::Json);
        assert_eq!(cli.verbose, 2);

        let config = build_config(&cli, None, 48000.0);
        assert_eq!(config.frame_size, Some(256));
        assert_eq!(config.expected_frequency, Some(1000.0));
        assert!(config.analyze_boundaries);
        assert_eq!(config.discontinuity_threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_flags_override_file_config() {
        let cli = Cli::try_parse_from(["glitchscan", "a.csv", "-t", "0.3", "--columns", "x,y"]).unwrap();
        assert_eq!(cli.columns, vec!["x".to_string(), "y".to_string()]);

        let file = AnalysisConfig::new(96000.0, 0.05, 0.02).with_top_k(3);
        let config = build_config(&cli, Some(file), 44100.0);

        // the loaded stream's rate always wins
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.discontinuity_threshold, 0.3);
        assert_eq!(config.boundary_threshold, 0.02);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_pair_conflicts_with_reference() {
        let result = Cli::try_parse_from(["glitchscan", "a.csv", "--pair", "--reference", "b.csv"]);
        assert!(result.is_err());
    }
}
