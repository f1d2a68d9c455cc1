use thiserror::Error;

/// Fatal decode error kinds surfaced by the [`crate::decoder::JournalDecoder`].
///
/// All variants are terminal: once one occurs, [`crate::decoder::JournalDecoder::scan`]
/// never again returns `true`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of stream at byte {position}")]
    UnexpectedEof { position: u64 },

    #[error("malformed varint at byte {position}: exceeded 10-byte limit")]
    MalformedVarint { position: u64 },

    #[error("frame at byte {position} declares length {len}, exceeding ceiling {ceiling}")]
    FrameTooLarge {
        position: u64,
        len: u64,
        ceiling: u64,
    },

    #[error("dangling reference to {scope} index {idx} at byte {position} (dictionary has {len} entries)")]
    DanglingRef {
        position: u64,
        scope: &'static str,
        idx: u64,
        len: usize,
    },

    #[error("unknown tag 0x{tag:02x} at byte {position}")]
    UnknownTag { position: u64, tag: u8 },

    #[error("KV_PAIR frame at byte {position} outside of an in-progress event")]
    UnexpectedKv { position: u64 },

    #[error("compression stream corrupt at byte {position}: {source}")]
    CompressionError {
        position: u64,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Best-effort byte offset at which the error was detected.
    pub fn position(&self) -> u64 {
        match self {
            DecodeError::UnexpectedEof { position }
            | DecodeError::MalformedVarint { position }
            | DecodeError::FrameTooLarge { position, .. }
            | DecodeError::DanglingRef { position, .. }
            | DecodeError::UnknownTag { position, .. }
            | DecodeError::UnexpectedKv { position }
            | DecodeError::CompressionError { position, .. } => *position,
        }
    }
}
