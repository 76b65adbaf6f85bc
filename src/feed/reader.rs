//! Feed reader
//!
//! Turns the inbound byte channel into a sequence of [`Message`]s, one per
//! line. The reader is driven from the relay's `select!` loop, so reads only
//! make progress when the underlying descriptor is readable.

use std::io;
use std::path::Path;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::{Error, Result};

use super::message::Message;

/// Default feed location, relative to the working directory
pub const DEFAULT_FEED_PATH: &str = "./nmea_fifo";

/// Type-erased feed source returned by [`open`]
pub type FeedSource = Pin<Box<dyn AsyncRead + Send>>;

/// Line reader over the feed
pub struct FeedReader<R> {
    reader: BufReader<R>,
    /// Bytes of the line currently being assembled
    pending: Vec<u8>,
    next_seq: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FeedReader<R> {
    /// Wrap a byte source
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            next_seq: 1,
            finished: false,
        }
    }

    /// Read the next line
    ///
    /// Returns `Ok(None)` once the feed reports end-of-stream; every later
    /// call returns `Ok(None)` as well. An unterminated final line is
    /// delivered as one last message before end-of-stream.
    ///
    /// Cancellation safe: bytes read before the future is dropped stay in the
    /// reader and are part of the next message.
    pub async fn read_message(&mut self) -> io::Result<Option<Message>> {
        if self.finished {
            return Ok(None);
        }

        let n = self.reader.read_until(b'\n', &mut self.pending).await?;
        if n == 0 && self.pending.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        let data = Bytes::from(std::mem::take(&mut self.pending));
        let seq = self.next_seq;
        self.next_seq += 1;

        Ok(Some(Message::new(seq, data)))
    }

    /// Number of messages produced so far
    pub fn messages_read(&self) -> u64 {
        self.next_seq - 1
    }
}

/// Open the feed at `path`
///
/// A named pipe is opened the way a blocking reader would open it: the call
/// waits until a producer opens the write end. After that the pipe is
/// switched to non-blocking mode and polled by the runtime. Regular files are
/// read through `tokio::fs`.
pub async fn open(path: impl AsRef<Path>) -> Result<FeedReader<FeedSource>> {
    let path = path.as_ref().to_path_buf();

    let blocking_path = path.clone();
    let opened = tokio::task::spawn_blocking(move || {
        if is_fifo(&blocking_path) {
            tracing::info!(feed = %blocking_path.display(), "Waiting for a producer to open the feed");
        }
        std::fs::File::open(blocking_path)
    })
    .await
    .map_err(io::Error::other)
    .and_then(|result| result);

    let source = opened
        .and_then(into_source)
        .map_err(|source| Error::FeedOpen {
            path: path.clone(),
            source,
        })?;

    tracing::info!(feed = %path.display(), "Feed opened");

    Ok(FeedReader::new(source))
}

#[cfg(unix)]
fn is_fifo(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_fifo())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_fifo(_path: &Path) -> bool {
    false
}

#[cfg(unix)]
fn into_source(file: std::fs::File) -> io::Result<FeedSource> {
    use std::os::unix::fs::FileTypeExt;

    if file.metadata()?.file_type().is_fifo() {
        let pipe = tokio::net::unix::pipe::Receiver::from_file(file)?;
        return Ok(Box::pin(pipe));
    }

    Ok(Box::pin(tokio::fs::File::from_std(file)))
}

#[cfg(not(unix))]
fn into_source(file: std::fs::File) -> io::Result<FeedSource> {
    Ok(Box::pin(tokio::fs::File::from_std(file)))
}
