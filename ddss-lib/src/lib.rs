//! A streaming decoder for the Splunk journal archive format, plus
//! writers that flatten decoded events into NDJSON, CSV, or Parquet.
#![forbid(unsafe_code)]

mod byte_reader;
mod compression;
mod decoder;
mod dictionary;
mod error;
mod event;
mod extract;
mod write;

pub use crate::byte_reader::{ByteReader, DEFAULT_FRAME_CEILING};
pub use crate::compression::{open_compressed, CompressionKind};
pub use crate::decoder::JournalDecoder;
pub use crate::dictionary::{DictionaryTable, Scope};
pub use crate::error::DecodeError;
pub use crate::event::Event;
pub use crate::extract::{extract, ExtractConfig, ExtractReport};
pub use crate::write::{CsvWriter, NdjsonWriter, Record, RecordWriter};

#[cfg(feature = "parquet")]
pub use crate::write::{ParquetWriter, DEFAULT_ROW_GROUP_SIZE};
