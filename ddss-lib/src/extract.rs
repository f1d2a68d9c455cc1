use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context};
use log::debug;

use crate::byte_reader::DEFAULT_FRAME_CEILING;
use crate::compression::open_compressed;
use crate::decoder::JournalDecoder;
use crate::write::{Record, RecordWriter};

/// Tunables for a single extraction run, mirroring the reference pair's
/// `Args`/`ETLOptions` builder-chaining convention.
#[derive(Debug, Clone, Copy)]
pub struct ExtractConfig {
    frame_ceiling: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            frame_ceiling: DEFAULT_FRAME_CEILING,
        }
    }
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_ceiling(mut self, frame_ceiling: u64) -> Self {
        self.frame_ceiling = frame_ceiling;
        self
    }
}

/// Summary of a completed (or partially completed, on error) extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub events_written: u64,
    pub bytes_read: u64,
}

/// Opens the compression adapter over `reader`, resolves each decoded
/// event's dictionary references, flattens into a [`Record`], and hands it
/// to `writer`. Checks `cancelled` between `scan()` calls so a caller on
/// another thread can request early termination.
///
/// Per spec §4.6 step 1 / §2's `endpoint → compression adapter → byte
/// reader → decoder` data flow, the input is always routed through
/// [`open_compressed`] before the decoder ever sees it, so a gzip- or
/// zstd-wrapped journal decodes exactly like its plaintext counterpart —
/// the decoder's byte reader only ever sees a continuous uncompressed
/// stream.
///
/// On a fatal decode error, returns `Err` with a message reporting how
/// many events were written and how many bytes were read before the
/// failure; no partial [`ExtractReport`] is returned on that path.
pub fn extract<'a, R: Read>(
    reader: R,
    mut writer: Box<dyn RecordWriter + 'a>,
    config: &ExtractConfig,
    cancelled: &AtomicBool,
) -> anyhow::Result<ExtractReport> {
    let (adapted, kind) =
        open_compressed(reader).context("failed to sniff/open compression adapter")?;
    debug!("detected {kind:?} compression on input stream");
    let mut decoder = JournalDecoder::with_frame_ceiling(adapted, config.frame_ceiling);
    let mut report = ExtractReport::default();

    loop {
        if cancelled.load(Ordering::Relaxed) {
            break;
        }
        if !decoder.scan() {
            break;
        }
        let event = decoder
            .get_event()
            .expect("scan() returned true implies an event is available");
        let record = Record {
            timestamp: event.index_time,
            host: String::from_utf8_lossy(decoder.host()).into_owned(),
            source: String::from_utf8_lossy(decoder.source()).into_owned(),
            sourcetype: String::from_utf8_lossy(decoder.source_type()).into_owned(),
            message: event.message_string(),
        };
        writer
            .write_record(&record)
            .context("failed to write decoded record")?;
        report.events_written += 1;
        report.bytes_read = decoder.position();
    }

    report.bytes_read = decoder.position();

    if let Some(err) = decoder.err() {
        bail!(
            "journal decode failed after {} event(s) ({} bytes read): {}",
            report.events_written,
            report.bytes_read,
            err
        );
    }

    writer.finish().context("failed to finalize output writer")?;
    Ok(report)
}
