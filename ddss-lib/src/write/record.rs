use serde::Serialize;

/// An analyst-facing flattened event: dictionary indices already resolved
/// to their byte strings. Field order is the deterministic key order
/// writers must preserve.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub timestamp: u32,
    pub host: String,
    pub source: String,
    pub sourcetype: String,
    pub message: String,
}

impl Record {
    pub const HEADERS: &'static [&'static str] =
        &["timestamp", "host", "source", "sourcetype", "message"];
}

/// Shared capability set for output sinks: a tagged variant of concrete
/// writers, not an inheritance hierarchy, behind a single trait object.
pub trait RecordWriter {
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()>;
    fn finish(self: Box<Self>) -> anyhow::Result<()>;
}
