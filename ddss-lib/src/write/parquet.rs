use std::io;
use std::sync::Arc;

use anyhow::Context;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use super::record::{Record, RecordWriter};

/// Default number of buffered records per row group.
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10_000;

const SCHEMA: &str = "
message ddss_event {
    REQUIRED INT32 timestamp (UINT_32);
    REQUIRED BYTE_ARRAY host (UTF8);
    REQUIRED BYTE_ARRAY source (UTF8);
    REQUIRED BYTE_ARRAY sourcetype (UTF8);
    REQUIRED BYTE_ARRAY message (UTF8);
}
";

/// Buffers [`Record`]s into row groups of `row_group_size` and flushes each
/// as a column-typed (`uint32, utf8, utf8, utf8, utf8`) row group to a
/// Parquet file.
pub struct ParquetWriter<W: io::Write + Send> {
    writer: Option<SerializedFileWriter<W>>,
    row_group_size: usize,
    buffer: Vec<Record>,
}

impl<W: io::Write + Send> ParquetWriter<W> {
    pub fn new(sink: W) -> anyhow::Result<Self> {
        Self::with_row_group_size(sink, DEFAULT_ROW_GROUP_SIZE)
    }

    pub fn with_row_group_size(sink: W, row_group_size: usize) -> anyhow::Result<Self> {
        let schema = Arc::new(parse_message_type(SCHEMA).context("invalid parquet schema")?);
        let props = Arc::new(WriterProperties::builder().build());
        let writer = SerializedFileWriter::new(sink, schema, props)
            .context("failed to open parquet writer")?;
        Ok(Self {
            writer: Some(writer),
            row_group_size: row_group_size.max(1),
            buffer: Vec::new(),
        })
    }

    fn flush_row_group(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let writer = self.writer.as_mut().expect("writer open until finish()");
        let mut row_group = writer.next_row_group().context("failed to open row group")?;

        let timestamps: Vec<i32> = self.buffer.iter().map(|r| r.timestamp as i32).collect();
        write_int32_column(&mut row_group, &timestamps)?;

        write_utf8_column(&mut row_group, self.buffer.iter().map(|r| r.host.as_str()))?;
        write_utf8_column(&mut row_group, self.buffer.iter().map(|r| r.source.as_str()))?;
        write_utf8_column(
            &mut row_group,
            self.buffer.iter().map(|r| r.sourcetype.as_str()),
        )?;
        write_utf8_column(&mut row_group, self.buffer.iter().map(|r| r.message.as_str()))?;

        row_group.close().context("failed to close row group")?;
        self.buffer.clear();
        Ok(())
    }
}

fn write_int32_column(
    row_group: &mut parquet::file::writer::SerializedRowGroupWriter<'_, impl io::Write + Send>,
    values: &[i32],
) -> anyhow::Result<()> {
    let mut col = row_group
        .next_column()
        .context("failed to open column")?
        .expect("schema declares this column");
    col.typed::<parquet::data_type::Int32Type>()
        .write_batch(values, None, None)
        .context("failed to write column values")?;
    col.close().context("failed to close column")?;
    Ok(())
}

fn write_utf8_column<'a>(
    row_group: &mut parquet::file::writer::SerializedRowGroupWriter<'_, impl io::Write + Send>,
    values: impl Iterator<Item = &'a str>,
) -> anyhow::Result<()> {
    let values: Vec<ByteArray> = values.map(|s| ByteArray::from(s)).collect();
    let mut col = row_group
        .next_column()
        .context("failed to open column")?
        .expect("schema declares this column");
    col.typed::<parquet::data_type::ByteArrayType>()
        .write_batch(&values, None, None)
        .context("failed to write column values")?;
    col.close().context("failed to close column")?;
    Ok(())
}

impl<W: io::Write + Send> RecordWriter for ParquetWriter<W> {
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()> {
        self.buffer.push(record.clone());
        if self.buffer.len() >= self.row_group_size {
            self.flush_row_group()?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> anyhow::Result<()> {
        self.flush_row_group()?;
        let writer = self.writer.take().expect("writer open until finish()");
        writer.close().context("failed to finalize parquet file")?;
        Ok(())
    }
}
