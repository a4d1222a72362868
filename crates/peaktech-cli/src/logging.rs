use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

/// Diagnostic output format on stderr.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// The level actually installed. `--quiet` caps it at `error`.
pub fn effective_filter(level: LogLevel, quiet: bool) -> LevelFilter {
    if quiet {
        level.as_filter().min(LevelFilter::ERROR)
    } else {
        level.as_filter()
    }
}

/// Install the stderr subscriber.
pub fn init_logging(format: LogFormat, level: LogLevel, quiet: bool) {
    let filter = effective_filter(level, quiet);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(filter)
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
