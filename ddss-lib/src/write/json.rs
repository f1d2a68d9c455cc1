use std::io;

use anyhow::Context;

use super::record::{Record, RecordWriter};

/// Incrementally serializes [`Record`]s as line-delimited JSON, one compact
/// object per line, so records are never all buffered into memory at once
/// (mirrors the reference pair's `write_json` incremental-serialization
/// style).
pub struct NdjsonWriter<W: io::Write> {
    writer: W,
}

impl<W: io::Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: io::Write> RecordWriter for NdjsonWriter<W> {
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .with_context(|| format!("failed to serialize {record:?}"))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            timestamp: 100,
            host: "host001".to_string(),
            source: "src".to_string(),
            sourcetype: "stype".to_string(),
            message: "hello".to_string(),
        }
    }

    #[test]
    fn writes_one_compact_line_with_deterministic_key_order() {
        let mut buf = Vec::new();
        let mut w = NdjsonWriter::new(&mut buf);
        w.write_record(&sample()).unwrap();
        Box::new(w).finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "{\"timestamp\":100,\"host\":\"host001\",\"source\":\"src\",\"sourcetype\":\"stype\",\"message\":\"hello\"}\n"
        );
    }

    #[test]
    fn writes_multiple_records_as_separate_lines() {
        let mut buf = Vec::new();
        let mut w = NdjsonWriter::new(&mut buf);
        w.write_record(&sample()).unwrap();
        w.write_record(&sample()).unwrap();
        Box::new(w).finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
