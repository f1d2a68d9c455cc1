use clap::{ArgAction, Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Ndjson,
    Csv,
    Parquet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn tracing_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn bump(self, steps: i32) -> Self {
        const LEVELS: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let cur = LEVELS.iter().position(|l| *l == self).unwrap() as i32;
        let next = (cur + steps).clamp(0, LEVELS.len() as i32 - 1);
        LEVELS[next as usize]
    }
}

/// Extracts events from an archived Splunk journal file, writing them to
/// NDJSON, CSV, or (with the `parquet` feature) Parquet.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Args {
    /// Path to the journal to read. Overrides `--input` when given.
    /// `-` means standard input, `s3://bucket/key` an object-store endpoint.
    #[clap(value_name = "INPUT")]
    pub positional_input: Option<String>,

    #[clap(
        short,
        long,
        default_value = "-",
        help = "Path to read the journal from (\"-\" = stdin, \"s3://bucket/key\" = object store)"
    )]
    pub input: String,

    #[clap(
        short,
        long,
        default_value = "-",
        help = "Path to write extracted records to (\"-\" = stdout, \"s3://bucket/key\" = object store)"
    )]
    pub output: String,

    #[clap(short, long, value_enum, default_value = "ndjson")]
    pub format: OutputFormat,

    #[clap(short, long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    #[clap(short, long, action = ArgAction::Count, help = "Raise the log level (repeatable)")]
    pub verbose: u8,

    #[clap(short, long, action = ArgAction::SetTrue, help = "Lower the log level to errors only")]
    pub quiet: bool,

    #[clap(long, default_value_t = 10_000)]
    pub row_group_size: usize,

    #[clap(long, default_value_t = ddss_lib::DEFAULT_FRAME_CEILING)]
    pub frame_ceiling: u64,
}

impl Args {
    /// The effective input path: the positional argument, if given, else `--input`.
    pub fn input_path(&self) -> &str {
        self.positional_input.as_deref().unwrap_or(&self.input)
    }

    /// Resolves `-l`/`-v`/`-q` into a single effective level.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.quiet {
            return LogLevel::Error;
        }
        self.log_level.bump(self.verbose as i32)
    }
}
