use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{bail, Context};
use futures::StreamExt;
use object_store::path::Path as StorePath;
use object_store::{aws::AmazonS3Builder, ObjectStore};

const S3_SCHEME: &str = "s3://";
const CHANNEL_DEPTH: usize = 8;

/// A write sink that may require an explicit commit step once every byte
/// has been written, beyond flushing its own internal buffers — e.g.
/// completing a remote multipart upload. Local files, stdout, and gzip
/// wrapping commit trivially via the default no-op; only the S3 backend
/// does real work here, and a failed commit there must reach the caller as
/// an error rather than be logged and swallowed.
pub trait CommitWrite: Write + Send {
    fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl CommitWrite for BufWriter<File> {}
impl CommitWrite for io::StdoutLock<'static> {}

impl CommitWrite for Box<dyn CommitWrite> {
    fn commit(&mut self) -> anyhow::Result<()> {
        (**self).commit()
    }
}

impl<W: CommitWrite> CommitWrite for flate2::write::GzEncoder<W> {
    fn commit(&mut self) -> anyhow::Result<()> {
        self.try_finish().context("failed to finish gzip stream")?;
        self.get_mut().commit()
    }
}

/// Opens `path` for reading: `-` is stdin, `s3://bucket/key` an
/// object-store endpoint bridged onto a background thread, anything else a
/// local file.
pub fn open_input(path: &str) -> anyhow::Result<Box<dyn Read + Send>> {
    if path == "-" {
        Ok(Box::new(io::stdin().lock()))
    } else if let Some(rest) = path.strip_prefix(S3_SCHEME) {
        let (bucket, key) = split_bucket_key(rest)?;
        Ok(Box::new(S3Reader::open(&bucket, &key)?))
    } else {
        let file = File::open(path)
            .with_context(|| format!("failed to open input file '{path}'"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Opens `path` for writing, creating parent directories for local files
/// and wrapping in gzip when the path ends in `.gz`, regardless of
/// endpoint family. The returned sink's [`CommitWrite::commit`] must be
/// called once the writer has finished with it; only then does a remote
/// backend's upload actually get completed.
pub fn open_output(path: &str) -> anyhow::Result<Box<dyn CommitWrite>> {
    let inner: Box<dyn CommitWrite> = if path == "-" {
        Box::new(io::stdout().lock())
    } else if let Some(rest) = path.strip_prefix(S3_SCHEME) {
        let (bucket, key) = split_bucket_key(rest)?;
        Box::new(S3Writer::open(&bucket, &key)?)
    } else {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create parent directories for '{path}'"))?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create output file '{path}'"))?;
        Box::new(BufWriter::new(file))
    };

    if path.ends_with(".gz") {
        Ok(Box::new(flate2::write::GzEncoder::new(
            inner,
            flate2::Compression::default(),
        )))
    } else {
        Ok(inner)
    }
}

fn split_bucket_key(rest: &str) -> anyhow::Result<(String, String)> {
    let mut parts = rest.splitn(2, '/');
    let bucket = parts.next().filter(|b| !b.is_empty());
    let key = parts.next().filter(|k| !k.is_empty());
    match (bucket, key) {
        (Some(b), Some(k)) => Ok((b.to_string(), k.to_string())),
        _ => bail!("malformed s3:// path, expected s3://bucket/key"),
    }
}

fn build_store(bucket: &str) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .build()
        .context("failed to configure S3 client from environment")?;
    Ok(Arc::new(store))
}

/// Bridges `object_store`'s async `GetResult` stream onto a synchronous
/// `Read`: a background thread drives a current-thread Tokio runtime and
/// pumps chunks through a bounded channel.
struct S3Reader {
    rx: Receiver<io::Result<Vec<u8>>>,
    leftover: Vec<u8>,
    leftover_pos: usize,
    handle: Option<JoinHandle<()>>,
}

impl S3Reader {
    fn open(bucket: &str, key: &str) -> anyhow::Result<Self> {
        let store = build_store(bucket)?;
        let path = StorePath::from(key);
        let (tx, rx) = sync_channel::<io::Result<Vec<u8>>>(CHANNEL_DEPTH);

        let handle = std::thread::Builder::new()
            .name("ddss-s3-get".into())
            .spawn(move || pump_get(store, path, tx))
            .context("failed to spawn S3 reader thread")?;

        Ok(Self {
            rx,
            leftover: Vec::new(),
            leftover_pos: 0,
            handle: Some(handle),
        })
    }
}

fn pump_get(store: Arc<dyn ObjectStore>, path: StorePath, tx: SyncSender<io::Result<Vec<u8>>>) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e)));
            return;
        }
    };
    runtime.block_on(async move {
        let result = store.get(&path).await;
        let mut stream = match result {
            Ok(get_result) => get_result.into_stream(),
            Err(e) => {
                let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e)));
                return;
            }
        };
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if tx.send(Ok(bytes.to_vec())).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e)));
                    return;
                }
            }
        }
    });
}

impl Read for S3Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.leftover_pos >= self.leftover.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.leftover = chunk;
                    self.leftover_pos = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(0), // sender dropped: stream finished cleanly
            }
        }
        let available = &self.leftover[self.leftover_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.leftover_pos += n;
        Ok(n)
    }
}

impl Drop for S3Reader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Bridges a synchronous `Write` onto `object_store`'s async multipart
/// upload API. Bytes are sent in chunks over a bounded channel to a
/// background thread that drives the upload; [`CommitWrite::commit`]
/// closes the channel, waits for the upload to complete, and surfaces any
/// failure to the caller.
struct S3Writer {
    tx: Option<SyncSender<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
    status: Arc<Mutex<Option<anyhow::Error>>>,
}

impl S3Writer {
    fn open(bucket: &str, key: &str) -> anyhow::Result<Self> {
        let store = build_store(bucket)?;
        let path = StorePath::from(key);
        let (tx, rx) = sync_channel::<Vec<u8>>(CHANNEL_DEPTH);
        let status = Arc::new(Mutex::new(None));
        let status_for_thread = Arc::clone(&status);

        let handle = std::thread::Builder::new()
            .name("ddss-s3-put".into())
            .spawn(move || pump_put(store, path, rx, status_for_thread))
            .context("failed to spawn S3 writer thread")?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            status,
        })
    }
}

fn pump_put(
    store: Arc<dyn ObjectStore>,
    path: StorePath,
    rx: Receiver<Vec<u8>>,
    status: Arc<Mutex<Option<anyhow::Error>>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            *status.lock().unwrap() = Some(anyhow::Error::new(e));
            return;
        }
    };
    runtime.block_on(async move {
        let mut upload = match store.put_multipart(&path).await {
            Ok(u) => u,
            Err(e) => {
                *status.lock().unwrap() = Some(anyhow::anyhow!("failed to start multipart upload: {e}"));
                return;
            }
        };
        while let Ok(chunk) = rx.recv() {
            if let Err(e) = upload.put_part(chunk.into()).await {
                *status.lock().unwrap() = Some(anyhow::anyhow!("multipart part upload failed: {e}"));
                let _ = upload.abort().await;
                return;
            }
        }
        if let Err(e) = upload.complete().await {
            *status.lock().unwrap() = Some(anyhow::anyhow!("multipart upload commit failed: {e}"));
        }
    });
}

impl Write for S3Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(tx) = &self.tx {
            tx.send(buf.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "S3 upload thread exited"))?;
            Ok(buf.len())
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer already closed"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommitWrite for S3Writer {
    /// Closes the channel (signaling the background thread to complete the
    /// multipart upload), waits for it to finish, and returns its result.
    /// A failed commit here must reach the caller, per the driver's
    /// fatal-on-commit-failure contract.
    fn commit(&mut self) -> anyhow::Result<()> {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Some(err) = self.status.lock().unwrap().take() {
            return Err(err).context("S3 multipart upload did not complete");
        }
        Ok(())
    }
}

impl Drop for S3Writer {
    /// Only reached if `commit()` was never called (e.g. the extraction
    /// failed before reaching it); joins the background thread so it is
    /// never leaked, and logs any outstanding failure since there is no
    /// caller left here to propagate it to.
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Some(err) = self.status.lock().unwrap().take() {
            tracing::error!("S3 upload did not complete: {err:#}");
        }
    }
}
