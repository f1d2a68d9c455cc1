use std::io::Read;

use log::{debug, error, trace};

use crate::byte_reader::{ByteReader, DEFAULT_FRAME_CEILING};
use crate::dictionary::{DictionaryTable, Scope};
use crate::error::DecodeError;
use crate::event::Event;

const TAG_END: u8 = 0x00;
const TAG_META_ADD_HOST: u8 = 0x01;
const TAG_META_ADD_SOURCE: u8 = 0x02;
const TAG_META_ADD_SOURCETYPE: u8 = 0x03;
const TAG_META_REF_HOST: u8 = 0x11;
const TAG_META_REF_SOURCE: u8 = 0x12;
const TAG_META_REF_SOURCETYPE: u8 = 0x13;
const TAG_EVENT: u8 = 0x20;
const TAG_KV_PAIR: u8 = 0x21;
const TAG_EXT_BLOCK: u8 = 0x7F;

/// Streaming decoder over Splunk journal framing. A two-method
/// pull API: repeatedly call [`scan`](Self::scan) to advance, and
/// [`get_event`](Self::get_event) to retrieve what it found.
///
/// Owns the reader and the three dictionary tables exclusively; concurrent
/// access from multiple callers is undefined.
pub struct JournalDecoder<R: Read> {
    reader: ByteReader<R>,
    dict: DictionaryTable,
    cur_host: Option<u64>,
    cur_source: Option<u64>,
    cur_sourcetype: Option<u64>,
    current_event: Option<Event>,
    last_error: Option<DecodeError>,
    ended: bool,
}

impl<R: Read> JournalDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_frame_ceiling(reader, DEFAULT_FRAME_CEILING)
    }

    pub fn with_frame_ceiling(reader: R, frame_ceiling: u64) -> Self {
        Self {
            reader: ByteReader::with_frame_ceiling(reader, frame_ceiling),
            dict: DictionaryTable::new(),
            cur_host: None,
            cur_source: None,
            cur_sourcetype: None,
            current_event: None,
            last_error: None,
            ended: false,
        }
    }

    /// Best-effort count of bytes consumed from the underlying stream.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// Error from the most recent fatal failure, if any.
    pub fn err(&self) -> Option<&DecodeError> {
        self.last_error.as_ref()
    }

    /// The event produced by the most recent `scan()` that returned `true`.
    /// Valid only until the next call to `scan()`.
    pub fn get_event(&self) -> Option<&Event> {
        self.current_event.as_ref()
    }

    /// Resolves the current event's host against the dictionary, or an
    /// empty buffer if unset.
    pub fn host(&self) -> &[u8] {
        self.resolve(self.current_event.as_ref().and_then(|e| e.host_idx), Scope::Host)
    }

    pub fn source(&self) -> &[u8] {
        self.resolve(
            self.current_event.as_ref().and_then(|e| e.source_idx),
            Scope::Source,
        )
    }

    pub fn source_type(&self) -> &[u8] {
        self.resolve(
            self.current_event.as_ref().and_then(|e| e.sourcetype_idx),
            Scope::SourceType,
        )
    }

    fn resolve(&self, idx: Option<u64>, scope: Scope) -> &[u8] {
        idx.and_then(|i| self.dict.get(scope, i)).unwrap_or(&[])
    }

    /// Advances to the next event. Returns `true` if an event is now
    /// available via [`get_event`](Self::get_event); `false` on clean
    /// end-of-stream or (after setting [`err`](Self::err)) on fatal failure.
    pub fn scan(&mut self) -> bool {
        if self.ended || self.last_error.is_some() {
            return false;
        }
        self.current_event = None;
        let mut pending: Option<Event> = None;

        loop {
            let tag = match self.next_tag(pending.is_some()) {
                Ok(Some(t)) => t,
                Ok(None) => {
                    self.ended = true;
                    return false;
                }
                Err(e) => return self.fail(e),
            };

            if let Some(ev) = pending.take() {
                if tag == TAG_KV_PAIR {
                    match self.read_kv_pair() {
                        Ok(kv) => {
                            let mut ev = ev;
                            ev.extra_fields.push(kv);
                            pending = Some(ev);
                            continue;
                        }
                        Err(e) => return self.fail(e),
                    }
                } else if tag == TAG_END {
                    self.ended = true;
                    self.current_event = Some(ev);
                    return true;
                } else {
                    // Not a continuation of this event: push the tag back
                    // for the next `scan()` call and yield what we have.
                    self.reader.unread_u8(tag);
                    self.current_event = Some(ev);
                    return true;
                }
            }

            match tag {
                TAG_META_ADD_HOST | TAG_META_ADD_SOURCE | TAG_META_ADD_SOURCETYPE => {
                    let scope = scope_for_add(tag);
                    match self.reader.read_len_prefixed() {
                        Ok(s) => {
                            let idx = self.dict.append(scope, s);
                            debug!("META_ADD {} -> idx {}", scope.name(), idx);
                        }
                        Err(e) => return self.fail(e),
                    }
                }
                TAG_META_REF_HOST | TAG_META_REF_SOURCE | TAG_META_REF_SOURCETYPE => {
                    let scope = scope_for_ref(tag);
                    let idx = match self.reader.read_varint_u64() {
                        Ok(idx) => idx,
                        Err(e) => return self.fail(e),
                    };
                    if idx >= self.dict.len(scope) as u64 {
                        return self.fail(DecodeError::DanglingRef {
                            position: self.reader.position(),
                            scope: scope.name(),
                            idx,
                            len: self.dict.len(scope),
                        });
                    }
                    debug!("META_REF {} -> idx {}", scope.name(), idx);
                    self.set_cur(scope, idx);
                }
                TAG_EVENT => {
                    let index_time = match self.reader.read_u32_be() {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                    let raw_message = match self.reader.read_len_prefixed() {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                    trace!("EVENT index_time={} len={}", index_time, raw_message.len());
                    pending = Some(Event {
                        index_time,
                        host_idx: self.cur_host,
                        source_idx: self.cur_source,
                        sourcetype_idx: self.cur_sourcetype,
                        raw_message,
                        extra_fields: Vec::new(),
                    });
                }
                TAG_KV_PAIR => {
                    return self.fail(DecodeError::UnexpectedKv {
                        position: self.reader.position(),
                    });
                }
                TAG_EXT_BLOCK => {
                    let len = match self.reader.read_varint_u64() {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                    if let Err(e) = self.reader.skip(len) {
                        return self.fail(e);
                    }
                }
                TAG_END => {
                    self.ended = true;
                    return false;
                }
                t if t & 0x80 != 0 => {
                    // Forward-compatible unknown frame: self-describing length, skip it.
                    let len = match self.reader.read_varint_u64() {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                    log::warn!("skipping unrecognized forward-compatible tag 0x{t:02x} ({len} bytes)");
                    if let Err(e) = self.reader.skip(len) {
                        return self.fail(e);
                    }
                }
                t => {
                    return self.fail(DecodeError::UnknownTag {
                        position: self.reader.position(),
                        tag: t,
                    });
                }
            }
        }
    }

    /// Reads the next tag byte. When `in_event` is true, end-of-stream here
    /// means the journal was truncated mid-assembly (no terminating `END`
    /// or completing frame ever arrived) and is reported as a fatal
    /// `UnexpectedEof` rather than a clean end. A stream ends cleanly only
    /// when it terminates with `END`; any other truncation is a decode
    /// failure, never a silent stop.
    fn next_tag(&mut self, in_event: bool) -> Result<Option<u8>, DecodeError> {
        if in_event {
            self.reader.read_u8().map(Some)
        } else {
            self.reader.try_read_tag()
        }
    }

    fn read_kv_pair(&mut self) -> Result<(Vec<u8>, Vec<u8>), DecodeError> {
        let key = self.reader.read_len_prefixed()?;
        let value = self.reader.read_len_prefixed()?;
        Ok((key, value))
    }

    fn set_cur(&mut self, scope: Scope, idx: u64) {
        match scope {
            Scope::Host => self.cur_host = Some(idx),
            Scope::Source => self.cur_source = Some(idx),
            Scope::SourceType => self.cur_sourcetype = Some(idx),
        }
    }

    fn fail(&mut self, err: DecodeError) -> bool {
        error!("journal decode failed at byte {}: {}", err.position(), err);
        self.last_error = Some(err);
        false
    }
}

fn scope_for_add(tag: u8) -> Scope {
    match tag {
        TAG_META_ADD_HOST => Scope::Host,
        TAG_META_ADD_SOURCE => Scope::Source,
        TAG_META_ADD_SOURCETYPE => Scope::SourceType,
        _ => unreachable!(),
    }
}

fn scope_for_ref(tag: u8) -> Scope {
    match tag {
        TAG_META_REF_HOST => Scope::Host,
        TAG_META_REF_SOURCE => Scope::Source,
        TAG_META_REF_SOURCETYPE => Scope::SourceType,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder_over(bytes: &[u8]) -> JournalDecoder<&[u8]> {
        JournalDecoder::new(bytes)
    }

    /// S1 — single event, no metadata.
    #[test]
    fn s1_single_event_no_metadata() {
        let bytes = [
            0x20, 0x00, 0x00, 0x00, 0x64, // EVENT time=100
            0x05, b'h', b'e', b'l', b'l', b'o', // "hello"
            0x00, // END
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        let ev = d.get_event().unwrap();
        assert_eq!(ev.index_time, 100);
        assert_eq!(ev.message_string(), "hello");
        assert_eq!(d.host(), b"");
        assert_eq!(d.source(), b"");
        assert_eq!(d.source_type(), b"");
        assert!(!d.scan());
        assert!(d.err().is_none());
    }

    /// S2 — one host, one event.
    #[test]
    fn s2_one_host_one_event() {
        let bytes = [
            0x01, 0x07, b'h', b'o', b's', b't', b'0', b'0', b'1', // META_ADD_HOST "host001"
            0x11, 0x00, // META_REF_HOST idx 0
            0x20, 0x00, 0x00, 0x00, 0xC8, // EVENT time=200
            0x03, b'f', b'o', b'o', // "foo"
            0x00, // END
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        let ev = d.get_event().unwrap();
        assert_eq!(ev.index_time, 200);
        assert_eq!(d.host(), b"host001");
        assert_eq!(ev.message_string(), "foo");
        assert!(!d.scan());
    }

    /// S3 — two events share host, differ in source.
    #[test]
    fn s3_two_events_share_host_differ_source() {
        let bytes = [
            0x01, 0x04, b'h', b'0', b'0', b'1', // META_ADD_HOST "h001"
            0x02, 0x03, b's', b'A', // META_ADD_SOURCE "sA"
            0x02, 0x03, b's', b'B', // META_ADD_SOURCE "sB"
            0x11, 0x00, // META_REF_HOST 0
            0x12, 0x00, // META_REF_SOURCE 0 (sA)
            0x20, 0x00, 0x00, 0x00, 0x01, 0x01, b'a', // EVENT t=1 "a"
            0x12, 0x01, // META_REF_SOURCE 1 (sB)
            0x20, 0x00, 0x00, 0x00, 0x02, 0x01, b'b', // EVENT t=2 "b"
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().index_time, 1);
        assert_eq!(d.host(), b"h001");
        assert_eq!(d.source(), b"sA");
        assert_eq!(d.get_event().unwrap().message_string(), "a");

        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().index_time, 2);
        assert_eq!(d.host(), b"h001");
        assert_eq!(d.source(), b"sB");
        assert_eq!(d.get_event().unwrap().message_string(), "b");

        assert!(!d.scan());
    }

    /// S4 — dangling ref.
    #[test]
    fn s4_dangling_ref() {
        let bytes = [0x11, 0x05, 0x00];
        let mut d = decoder_over(&bytes);
        assert!(!d.scan());
        assert!(matches!(d.err(), Some(DecodeError::DanglingRef { .. })));
        // terminal: further scans never succeed.
        assert!(!d.scan());
    }

    /// S5 — unknown forward-compatible tag skipped.
    #[test]
    fn s5_forward_compatible_tag_skipped() {
        let bytes = [
            0x80, 0x03, 0xFF, 0xFF, 0xFF, // unknown tag, len 3, skipped
            0x20, 0x00, 0x00, 0x00, 0x09, 0x01, b'x', // EVENT t=9 "x"
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().index_time, 9);
        assert_eq!(d.get_event().unwrap().message_string(), "x");
        assert!(!d.scan());
        assert!(d.err().is_none());
    }

    #[test]
    fn s6_zstd_compressed_stream_decodes_like_plain() {
        let plain = [
            0x01, 0x07, b'h', b'o', b's', b't', b'0', b'0', b'1',
            0x11, 0x00,
            0x20, 0x00, 0x00, 0x00, 0xC8,
            0x03, b'f', b'o', b'o',
            0x00,
        ];
        let compressed = zstd::stream::encode_all(&plain[..], 0).unwrap();
        let (reader, _) = crate::compression::open_compressed(&compressed[..]).unwrap();
        let mut d = JournalDecoder::new(reader);
        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().index_time, 200);
        assert_eq!(d.host(), b"host001");
        assert_eq!(d.get_event().unwrap().message_string(), "foo");
        assert!(!d.scan());
    }

    #[test]
    fn empty_stream_yields_zero_events_no_error() {
        let mut d = decoder_over(&[]);
        assert!(!d.scan());
        assert!(d.err().is_none());
    }

    #[test]
    fn only_metadata_then_end_yields_zero_events() {
        let bytes = [0x01, 0x02, b'h', b'0', 0x11, 0x00, 0x00];
        let mut d = decoder_over(&bytes);
        assert!(!d.scan());
        assert!(d.err().is_none());
    }

    #[test]
    fn scan_false_is_sticky_after_clean_end() {
        let bytes = [0x00];
        let mut d = decoder_over(&bytes);
        assert!(!d.scan());
        assert!(!d.scan());
        assert!(!d.scan());
    }

    #[test]
    fn ext_block_zero_length_is_skipped() {
        let bytes = [
            0x7F, 0x00, // EXT_BLOCK len 0
            0x20, 0x00, 0x00, 0x00, 0x01, 0x01, b'a',
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().message_string(), "a");
    }

    #[test]
    fn ext_block_too_large_is_fatal() {
        // declared length exceeds a tiny ceiling.
        let bytes = [0x7F, 0x80, 0x01]; // varint 128
        let mut d = JournalDecoder::with_frame_ceiling(&bytes[..], 4);
        assert!(!d.scan());
        assert!(matches!(d.err(), Some(DecodeError::FrameTooLarge { .. })));
    }

    #[test]
    fn kv_pair_with_no_pending_event_is_fatal() {
        let bytes = [
            0x20, 0x00, 0x00, 0x00, 0x01, 0x01, b'a', // EVENT t=1 "a"
            0x01, 0x01, b'h', // META_ADD_HOST "h" — completes the event above
            0x21, 0x01, b'k', 0x01, b'v', // stray KV_PAIR with nothing pending
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        assert_eq!(d.get_event().unwrap().message_string(), "a");
        assert!(!d.scan());
        assert!(matches!(d.err(), Some(DecodeError::UnexpectedKv { .. })));
    }

    #[test]
    fn kv_pair_outside_event_before_any_event_is_fatal() {
        let bytes = [0x21, 0x01, b'k', 0x01, b'v', 0x00];
        let mut d = decoder_over(&bytes);
        assert!(!d.scan());
        assert!(matches!(d.err(), Some(DecodeError::UnexpectedKv { .. })));
    }

    #[test]
    fn truncation_mid_event_is_unexpected_eof() {
        let bytes = [0x20, 0x00, 0x00, 0x00]; // missing last byte of index_time
        let mut d = decoder_over(&bytes);
        assert!(!d.scan());
        assert!(matches!(d.err(), Some(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn extra_fields_preserve_order_and_duplicates() {
        let bytes = [
            0x20, 0x00, 0x00, 0x00, 0x01, 0x01, b'a', // EVENT
            0x21, 0x01, b'k', 0x01, b'1', // KV k=1
            0x21, 0x01, b'k', 0x01, b'2', // KV k=2 (duplicate key)
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        let ev = d.get_event().unwrap();
        assert_eq!(
            ev.extra_fields,
            vec![
                (b"k".to_vec(), b"1".to_vec()),
                (b"k".to_vec(), b"2".to_vec()),
            ]
        );
    }

    #[test]
    fn only_last_meta_ref_before_event_takes_effect() {
        let bytes = [
            0x01, 0x02, b'h', b'0', // META_ADD_HOST "h0"
            0x01, 0x02, b'h', b'1', // META_ADD_HOST "h1"
            0x11, 0x00, // ref idx 0
            0x11, 0x01, // ref idx 1 (overrides)
            0x20, 0x00, 0x00, 0x00, 0x01, 0x01, b'a',
            0x00,
        ];
        let mut d = decoder_over(&bytes);
        assert!(d.scan());
        assert_eq!(d.host(), b"h1");
    }
}
