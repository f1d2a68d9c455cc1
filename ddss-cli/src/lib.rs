mod args;
mod endpoints;
mod logging;

pub use crate::args::{Args, LogLevel, OutputFormat};
pub use crate::endpoints::{open_input, open_output, CommitWrite};
pub use crate::logging::init as init_logging;

use anyhow::Context;
use ddss_lib::{CsvWriter, NdjsonWriter, RecordWriter};

/// Process exit codes.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const FATAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const MISSING_FORMAT_SUPPORT: i32 = 3;
}

/// Whether this build can actually produce `format`. Checked before opening
/// the output endpoint so a missing-feature failure never leaves a
/// partially created output file behind.
pub fn format_is_supported(format: OutputFormat) -> bool {
    match format {
        OutputFormat::Ndjson | OutputFormat::Csv => true,
        OutputFormat::Parquet => cfg!(feature = "parquet"),
    }
}

/// Builds the writer selected by `--format`, borrowing `sink` rather than
/// taking ownership of it: the caller retains `sink` so it can call
/// [`CommitWrite::commit`] on it once the returned writer's `finish()` has
/// run. Caller must have already checked [`format_is_supported`].
pub fn build_writer<'a>(
    format: OutputFormat,
    sink: &'a mut dyn CommitWrite,
    row_group_size: usize,
) -> anyhow::Result<Box<dyn RecordWriter + 'a>> {
    match format {
        OutputFormat::Ndjson => Ok(Box::new(NdjsonWriter::new(sink))),
        OutputFormat::Csv => {
            let writer = CsvWriter::new(sink).context("failed to start CSV writer")?;
            Ok(Box::new(writer))
        }
        OutputFormat::Parquet => build_parquet_writer(sink, row_group_size),
    }
}

#[cfg(feature = "parquet")]
fn build_parquet_writer<'a>(
    sink: &'a mut dyn CommitWrite,
    row_group_size: usize,
) -> anyhow::Result<Box<dyn RecordWriter + 'a>> {
    let writer = ddss_lib::ParquetWriter::with_row_group_size(sink, row_group_size)
        .context("failed to start parquet writer")?;
    Ok(Box::new(writer))
}

#[cfg(not(feature = "parquet"))]
fn build_parquet_writer<'a>(
    _sink: &'a mut dyn CommitWrite,
    _row_group_size: usize,
) -> anyhow::Result<Box<dyn RecordWriter + 'a>> {
    unreachable!("format_is_supported(Parquet) is false without the 'parquet' feature")
}
