//! Incremental zip encoding of named payloads into a chunk stream.
//!
//! Each payload is deflated on its own first, so its CRC and sizes are known
//! before its local header is written into the archive. The archive writer
//! then never seeks back, and every byte is handed out as a chunk right
//! after the member that produced it. [`SpoolWriter`] keeps only the bytes
//! not yet handed out and rejects any seek into released ones.
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One unit of assembler input. Entries with an empty path or no data (a
/// skipped fetch) are dropped without producing an archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Option<Bytes>,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            data: Some(data.into()),
        }
    }

    pub fn skipped() -> Self {
        Self {
            path: String::new(),
            data: None,
        }
    }

    fn into_member(self) -> Option<(String, Bytes)> {
        if self.path.is_empty() {
            return None;
        }
        self.data.map(|data| (self.path, data))
    }
}

#[derive(Default)]
struct Spool {
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]`; everything before it was handed out.
    base: u64,
    pos: u64,
}

impl Spool {
    fn end(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    fn write_at_pos(&mut self, data: &[u8]) -> usize {
        let start = (self.pos - self.base) as usize;
        let end = start + data.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[start..end].copy_from_slice(data);
        self.pos += data.len() as u64;
        data.len()
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.end()) + i128::from(delta),
        };
        if target < i128::from(self.base) || target > i128::from(self.end()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "seek to {} outside retained window {}..{}",
                    target,
                    self.base,
                    self.end()
                ),
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    /// Hand out everything before `offset`.
    fn take_until(&mut self, offset: u64) -> Bytes {
        let n = offset.saturating_sub(self.base).min(self.buf.len() as u64) as usize;
        let rest = self.buf.split_off(n);
        let ready = std::mem::replace(&mut self.buf, rest);
        self.base += n as u64;
        Bytes::from(ready)
    }
}

#[derive(Clone, Default)]
struct SpoolWriter(Arc<Mutex<Spool>>);

impl SpoolWriter {
    fn with<R>(&self, f: impl FnOnce(&mut Spool) -> R) -> io::Result<R> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "archive spool poisoned"))?;
        Ok(f(&mut guard))
    }
}

impl Write for SpoolWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.with(|spool| spool.write_at_pos(data))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SpoolWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.with(|spool| spool.seek(pos))?
    }
}

fn zip_error(err: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Deflate `data` into a standalone one-member archive.
fn encode_member(
    path: &str,
    data: &[u8],
) -> zip::result::ZipResult<ZipArchive<Cursor<Vec<u8>>>> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(data.len() as u64 >= u64::from(u32::MAX))
        .unix_permissions(0o644);
    let mut single = ZipWriter::new(Cursor::new(Vec::with_capacity(data.len() / 2 + 64)));
    single.start_file(path, options)?;
    single.write_all(data)?;
    let mut encoded = single.finish()?;
    encoded.set_position(0);
    ZipArchive::new(encoded)
}

/// Single-writer zip encoder that returns finished bytes as it goes.
pub struct ZipAssembler {
    writer: ZipWriter<SpoolWriter>,
    spool: SpoolWriter,
    members: usize,
}

impl Default for ZipAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipAssembler {
    pub fn new() -> Self {
        let spool = SpoolWriter::default();
        Self {
            writer: ZipWriter::new(spool.clone()),
            spool,
            members: 0,
        }
    }

    pub fn members(&self) -> usize {
        self.members
    }

    /// Append a deflated member and return its encoded bytes.
    ///
    /// The returned chunk is the complete local entry for `path`; nothing of
    /// it is held back for a later call. Colliding paths are written as
    /// separate members.
    pub fn add(&mut self, path: &str, data: &[u8]) -> io::Result<Bytes> {
        let mut single = encode_member(path, data).map_err(zip_error)?;
        let member = single.by_index_raw(0).map_err(zip_error)?;
        self.writer.raw_copy_file(member).map_err(zip_error)?;
        self.members += 1;
        self.spool.with(|spool| {
            let end = spool.end();
            spool.take_until(end)
        })
    }

    /// Write the central directory and return every remaining byte.
    pub fn finish(mut self) -> io::Result<Bytes> {
        self.writer.finish().map_err(zip_error)?;
        debug!(members = self.members, "archive finalized");
        self.spool.with(|spool| {
            let end = spool.end();
            spool.take_until(end)
        })
    }
}

/// Encode `entries` in arrival order into a lazy stream of archive chunks.
///
/// Each member's chunk is emitted as soon as its entry has been encoded; the
/// central directory is the last chunk, after `entries` ends. Empty chunks
/// are never yielded.
pub fn assemble<S>(entries: S) -> impl Stream<Item = io::Result<Bytes>>
where
    S: Stream<Item = ArchiveEntry> + Unpin,
{
    stream::try_unfold(
        Some((entries, ZipAssembler::new())),
        |state| async move {
            let Some((mut entries, mut zip)) = state else {
                return Ok::<_, io::Error>(None);
            };
            while let Some(entry) = entries.next().await {
                let Some((path, data)) = entry.into_member() else {
                    continue;
                };
                let ready = zip.add(&path, &data)?;
                if !ready.is_empty() {
                    return Ok(Some((ready, Some((entries, zip)))));
                }
            }
            let tail = zip.finish()?;
            Ok(Some((tail, None)))
        },
    )
}
