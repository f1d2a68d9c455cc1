mod csv;
mod json;
#[cfg(feature = "parquet")]
mod parquet;
mod record;

pub use self::csv::CsvWriter;
pub use self::json::NdjsonWriter;
#[cfg(feature = "parquet")]
pub use self::parquet::{ParquetWriter, DEFAULT_ROW_GROUP_SIZE};
pub use self::record::{Record, RecordWriter};
