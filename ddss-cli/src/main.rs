use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::Parser;
use ddss_cli::{
    build_writer, exit_code, format_is_supported, init_logging, open_input, open_output,
    Args, CommitWrite,
};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.effective_log_level());

    match run(&args) {
        Ok(report) => {
            tracing::info!(
                "wrote {} event(s), read {} byte(s)",
                report.events_written,
                report.bytes_read
            );
            ExitCode::from(exit_code::OK as u8)
        }
        Err(RunError::MissingFormatSupport(msg)) => {
            eprintln!("ddss: {msg}");
            ExitCode::from(exit_code::MISSING_FORMAT_SUPPORT as u8)
        }
        Err(RunError::Fatal(err)) => {
            eprintln!("ddss: {err:#}");
            ExitCode::from(exit_code::FATAL as u8)
        }
    }
}

enum RunError {
    MissingFormatSupport(String),
    Fatal(anyhow::Error),
}

impl From<anyhow::Error> for RunError {
    fn from(err: anyhow::Error) -> Self {
        RunError::Fatal(err)
    }
}

fn run(args: &Args) -> Result<ddss_lib::ExtractReport, RunError> {
    if !format_is_supported(args.format) {
        return Err(RunError::MissingFormatSupport(format!(
            "'{:?}' output was requested but this build was not compiled with the matching feature",
            args.format
        )));
    }

    let input = open_input(args.input_path())?;
    let mut output = open_output(&args.output)?;
    let writer = build_writer(args.format, output.as_mut(), args.row_group_size)?;

    let config = ddss_lib::ExtractConfig::new().with_frame_ceiling(args.frame_ceiling);
    let cancelled = AtomicBool::new(false);
    let report = ddss_lib::extract(input, writer, &config, &cancelled)?;
    output.commit().context("failed to commit output")?;
    Ok(report)
}
