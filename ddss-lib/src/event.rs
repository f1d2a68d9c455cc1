/// A decoded journal record.
///
/// Owns its `raw_message` buffer (a copy, not a borrow into the reader) so
/// downstream writers may hold an `Event` across further `scan()` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Journal time of indexing, Unix epoch seconds.
    pub index_time: u32,
    /// Index into the host dictionary, or `None` if never set on this stream.
    pub host_idx: Option<u64>,
    /// Index into the source dictionary, or `None` if never set on this stream.
    pub source_idx: Option<u64>,
    /// Index into the sourcetype dictionary, or `None` if never set on this stream.
    pub sourcetype_idx: Option<u64>,
    /// Opaque payload, caller-interpreted (typically UTF-8), returned verbatim.
    pub raw_message: Vec<u8>,
    /// Key/value pairs captured from `KV_PAIR` frames, in insertion order.
    /// Duplicate keys are preserved.
    pub extra_fields: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Event {
    /// Interprets `raw_message` as UTF-8, replacing invalid sequences with
    /// the Unicode replacement character.
    pub fn message_string(&self) -> String {
        String::from_utf8_lossy(&self.raw_message).into_owned()
    }
}
