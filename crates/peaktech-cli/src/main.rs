use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use peaktech_core::{
    AcquisitionConfig, AcquisitionLoop, AcquisitionStats, ByteSource, CaptureFormat,
    CaptureReport, EventSink, InputInfo, IoSource, LoopExit, ReplaySource, ReportBuilder,
    StopSignal, load_capture,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

mod logging;

use crate::logging::{LogFormat, LogLevel, init_logging};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("PEAKTECH_BUILD_COMMIT"),
    ", ",
    env!("PEAKTECH_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  peaktech capture decode capture.bin -o report.json\n  peaktech capture decode dump.txt --stdout --pretty\n  cat /dev/ttyUSB0 | peaktech capture decode - --stdout";

const DECODE_HELP: &str = "Examples:\n  peaktech capture decode capture.bin -o report.json\n  peaktech capture decode dump.txt --stdout --pretty\n  cat /dev/ttyUSB0 | peaktech capture decode - --stdout\n\nStdin input:\n  Every reading is kept in memory and the report is written only when\n  stdin closes or Ctrl-C stops the capture. Bound live captures with\n  `timeout` or `head -c` upstream.";

#[derive(Parser, Debug)]
#[command(name = "peaktech")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Frame decoder for PeakTech 2510 serial telemetry captures.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Log output format (stderr)
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr)
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on recorded or piped serial captures.
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CaptureCommands {
    /// Synchronize and decode every frame in a capture into a JSON report.
    #[command(after_help = DECODE_HELP)]
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Capture file, a pattern matching exactly one file, or `-` for stdin
    /// (read until it closes; the report is written at the end)
    input: PathBuf,

    /// Output report path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Capture format: raw or repr (default: repr for .txt, raw otherwise)
    #[arg(long, value_name = "FORMAT")]
    format: Option<CaptureFormat>,

    /// Discarded bytes allowed while hunting for a frame start
    #[arg(long, value_name = "BYTES")]
    budget: Option<usize>,

    /// Per-byte read timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    read_timeout_ms: u64,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero code if any frame was rejected
    #[arg(long)]
    strict: bool,

    /// List rejected frame classes after decoding
    #[arg(long)]
    list_rejections: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Capture { command } => match command {
            CaptureCommands::Decode(args) => {
                init_logging(cli.log_format, cli.log_level, args.quiet);
                cmd_capture_decode(args)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

/// Where the capture bytes come from.
enum CaptureInput {
    Stdin,
    File(PathBuf),
}

fn cmd_capture_decode(args: DecodeArgs) -> Result<(), CliError> {
    let config = build_config(&args)?;
    let input = if args.input.as_os_str() == "-" {
        CaptureInput::Stdin
    } else {
        let resolved = resolve_input_path(&args.input)?;
        validate_input_file(&resolved)?;
        CaptureInput::File(resolved)
    };

    if let (CaptureInput::File(path), Some(report_path)) = (&input, args.report.as_ref()) {
        ensure_distinct_output(path, report_path)?;
    }

    let (info, source) = open_input(&input, args.format)?;
    let mut rep = run_acquisition(info, source, config)?;
    rep.generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("Failed to format report timestamp")?;
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    if args.stdout {
        println!("{}", json);
    } else {
        let report = args.report.as_ref().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?;
        write_report(report, &json)?;
        if !args.quiet {
            eprintln!("OK: report written -> {}", report.display());
        }
    }

    if args.list_rejections && !args.quiet {
        print_rejections(&rep);
    }
    if let Some(message) = &rep.summary.source_error {
        return Err(CliError::new(
            format!("byte source failed: {message}"),
            Some("the report covers everything decoded before the failure".to_string()),
        ));
    }
    if args.strict && rep.summary.rejected > 0 {
        return Err(CliError::new(
            "rejected frames detected",
            Some("use --list-rejections to inspect".to_string()),
        ));
    }
    Ok(())
}

fn build_config(args: &DecodeArgs) -> Result<AcquisitionConfig, CliError> {
    let mut config = AcquisitionConfig::default()
        .with_read_timeout(Duration::from_millis(args.read_timeout_ms));
    if let Some(budget) = args.budget {
        config = config.with_byte_budget(budget).map_err(|err| {
            CliError::new(
                format!("invalid --budget: {err}"),
                Some("pass a positive number of bytes".to_string()),
            )
        })?;
    }
    Ok(config)
}

fn open_input(
    input: &CaptureInput,
    format: Option<CaptureFormat>,
) -> Result<(InputInfo, Box<dyn ByteSource + Send>), CliError> {
    match input {
        CaptureInput::Stdin => {
            let format = format.unwrap_or(CaptureFormat::Raw);
            let source: Box<dyn ByteSource + Send> = match format {
                CaptureFormat::Raw => Box::new(
                    IoSource::new(io::stdin()).context("Failed to start the stdin reader")?,
                ),
                // repr dumps are text and only parseable as a whole
                CaptureFormat::Repr => {
                    let text = io::read_to_string(io::stdin()).context("Failed to read stdin")?;
                    let bytes = peaktech_core::parse_repr_capture(&text).map_err(|err| {
                        CliError::new(
                            format!("invalid repr capture on stdin: {err}"),
                            Some("pass --format raw for binary input".to_string()),
                        )
                    })?;
                    Box::new(ReplaySource::new(bytes))
                }
            };
            let info = InputInfo {
                path: "-".to_string(),
                format: format.as_str().to_string(),
            };
            Ok((info, source))
        }
        CaptureInput::File(path) => {
            let format = format.unwrap_or_else(|| CaptureFormat::from_path(path));
            let bytes = load_capture(path, format).map_err(|err| {
                CliError::new(
                    format!("failed to load capture {}: {err}", path.display()),
                    Some(format!(
                        "check the file, or pass --format {}",
                        match format {
                            CaptureFormat::Raw => "repr",
                            CaptureFormat::Repr => "raw",
                        }
                    )),
                )
            })?;
            debug!(path = %path.display(), bytes = bytes.len(), "capture loaded");
            let info = InputInfo {
                path: path.display().to_string(),
                format: format.as_str().to_string(),
            };
            let source: Box<dyn ByteSource + Send> = Box::new(ReplaySource::new(bytes));
            Ok((info, source))
        }
    }
}

/// Run the loop on a worker thread and aggregate its events here.
fn run_acquisition(
    info: InputInfo,
    source: Box<dyn ByteSource + Send>,
    config: AcquisitionConfig,
) -> Result<CaptureReport, CliError> {
    let stop = StopSignal::new();
    install_ctrlc_handler(stop.clone())?;

    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("acquisition".to_string())
        .spawn(move || -> (LoopExit, AcquisitionStats) {
            let mut tx = tx;
            let mut acquisition = AcquisitionLoop::new(source, config).with_stop_signal(stop);
            let exit = acquisition.run(&mut tx);
            (exit, acquisition.stats())
        })
        .context("Failed to start acquisition thread")?;

    let mut builder = ReportBuilder::new();
    for event in rx {
        // ReportBuilder never closes
        let _ = builder.accept(event);
    }
    let (exit, stats) = worker
        .join()
        .map_err(|_| CliError::new("acquisition thread panicked", None))?;

    info!(
        exit = exit.as_str(),
        readings = stats.readings,
        rejected = stats.rejected,
        bytes_read = stats.bytes_read,
        "acquisition finished"
    );
    Ok(builder.finish(info, &config, stats, exit))
}

fn install_ctrlc_handler(stop: StopSignal) -> Result<(), CliError> {
    ctrlc::set_handler(move || stop.stop()).map_err(|err| {
        CliError::new(
            format!("signal handler setup failed: {err}"),
            None,
        )
    })
}

fn serialize_report(rep: &CaptureReport, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn write_report(report: &Path, json: &str) -> Result<(), CliError> {
    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(report, json)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;
    Ok(())
}

fn print_rejections(rep: &CaptureReport) {
    eprintln!("Rejected frames:");
    for rejection in &rep.rejections {
        eprintln!("  {} ({})", rejection.id, rejection.count);
    }
}

fn ensure_distinct_output(input: &Path, report_path: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent),
        _ => fs::canonicalize("."),
    };
    // a missing output directory is created later and cannot alias the input
    let Ok(report_dir) = report_dir else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| CliError::new("invalid report path", None))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a capture file, or - to read from stdin".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a capture file, or - to read from stdin".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches)",
            pattern,
            matches.len()
        );
        let listed: Vec<String> = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect();
        message.push_str("; matches: ");
        message.push_str(&listed.join(", "));
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(
            message,
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
