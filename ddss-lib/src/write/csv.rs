use std::io;

use anyhow::Context;

use super::record::{Record, RecordWriter};

/// Writes a single header row (RFC 4180 quoting courtesy of the `csv`
/// crate), then one row per [`Record`], terminator forced to LF.
pub struct CsvWriter<W: io::Write> {
    inner: csv::Writer<W>,
}

impl<W: io::Write> CsvWriter<W> {
    pub fn new(writer: W) -> anyhow::Result<Self> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        inner
            .write_record(Record::HEADERS)
            .context("failed to write CSV header")?;
        Ok(Self { inner })
    }
}

impl<W: io::Write> RecordWriter for CsvWriter<W> {
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()> {
        self.inner
            .serialize(record)
            .with_context(|| format!("failed to serialize {record:?}"))
    }

    fn finish(mut self: Box<Self>) -> anyhow::Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            timestamp: 7,
            host: "h, with comma".to_string(),
            source: "src\nwith newline".to_string(),
            sourcetype: "stype".to_string(),
            message: "hello \"quoted\"".to_string(),
        }
    }

    #[test]
    fn writes_header_then_rows_with_lf_terminator() {
        let mut buf = Vec::new();
        let mut w = CsvWriter::new(&mut buf).unwrap();
        w.write_record(&sample()).unwrap();
        Box::new(w).finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.split('\n');
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,host,source,sourcetype,message"
        );
        assert!(!text.contains("\r\n"));
    }

    #[test]
    fn quotes_embedded_commas_newlines_and_quotes() {
        let mut buf = Vec::new();
        let mut w = CsvWriter::new(&mut buf).unwrap();
        w.write_record(&sample()).unwrap();
        Box::new(w).finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"h, with comma\""));
        assert!(text.contains("\"src\nwith newline\""));
        assert!(text.contains("\"hello \"\"quoted\"\"\""));
    }
}
