use std::io::{self, BufReader, Chain, Cursor, Read};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Which decompressor the sniff selected, for diagnostics/logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Identity,
    Zstd,
    Gzip,
}

/// Peeked-and-rewound prefix of the underlying stream, chained back in
/// front of it. The sniff never discards bytes: either they are consumed
/// here and then replayed via this `Chain`, or (for streams shorter than
/// the magic) simply chained through unchanged.
type Prefixed<R> = Chain<Cursor<Vec<u8>>, BufReader<R>>;

/// Sniffs the first few bytes of `reader` to select a decompressor.
/// Returns a boxed `Read` so `ddss_lib::ByteReader` sees a
/// single continuous uncompressed stream regardless of which branch was
/// taken. Bounded by `reader`'s own lifetime rather than `'static` so
/// callers can adapt borrowed readers (e.g. test fixtures, `&[u8]`) as
/// well as owned, `'static` endpoint streams.
pub fn open_compressed<'r, R: Read + 'r>(
    reader: R,
) -> io::Result<(Box<dyn Read + 'r>, CompressionKind)> {
    let mut buffered = BufReader::new(reader);
    let mut peek = [0u8; 4];
    let mut filled = 0;
    while filled < peek.len() {
        let n = buffered.read(&mut peek[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let prefix = Cursor::new(peek[..filled].to_vec());
    let chained: Prefixed<R> = prefix.chain(buffered);

    if peek[..filled].starts_with(&ZSTD_MAGIC) {
        let boxed: Box<dyn Read + 'r> = Box::new(zstd::stream::read::Decoder::new(chained)?);
        Ok((boxed, CompressionKind::Zstd))
    } else if peek[..filled].starts_with(&GZIP_MAGIC) {
        let boxed: Box<dyn Read + 'r> = Box::new(flate2::read::MultiGzDecoder::new(chained));
        Ok((boxed, CompressionKind::Gzip))
    } else {
        let boxed: Box<dyn Read + 'r> = Box::new(chained);
        Ok((boxed, CompressionKind::Identity))
    }
}
