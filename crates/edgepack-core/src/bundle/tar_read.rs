use std::cell::Cell;
use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;

use flate2::read::GzDecoder;

/// Reader that remembers whether the underlying source ever failed.
///
/// Lets a copy loop tell a corrupt or unreadable source apart from a failing
/// destination when both sides share one `io::Error` path.
pub(crate) struct SourceReader<R> {
    inner: R,
    failed: Rc<Cell<bool>>,
}

impl<R: Read> SourceReader<R> {
    pub(crate) fn new(inner: R) -> (Self, Rc<Cell<bool>>) {
        let failed = Rc::new(Cell::new(false));
        (
            Self {
                inner,
                failed: Rc::clone(&failed),
            },
            failed,
        )
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != io::ErrorKind::Interrupted => {
                self.failed.set(true);
                Err(e)
            }
            other => other,
        }
    }
}

/// Streaming view over a gzip'd tar. Entries are yielded once, in order.
pub(crate) type GzArchive<R> = tar::Archive<SourceReader<GzDecoder<R>>>;

pub(crate) fn open_gz_archive<R: Read>(reader: R) -> (GzArchive<R>, Rc<Cell<bool>>) {
    let (source, failed) = SourceReader::new(GzDecoder::new(reader));
    (tar::Archive::new(source), failed)
}

/// Read at most `limit` bytes; `None` if the source holds more.
pub(crate) fn read_bounded<R: Read>(reader: R, limit: u64) -> io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(buf))
}

/// Archive member name with any leading `./` removed, `/`-separated.
pub(crate) fn member_name(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    let mut name = s.as_str();
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name.to_string()
}
