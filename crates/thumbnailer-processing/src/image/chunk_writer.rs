use crate::error::ProcessingError;
use bytes::{Bytes, BytesMut};
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Blocking `Write` sink that forwards encoder output as fixed-size chunks.
///
/// Runs on the blocking pool. Each full chunk is sent over a bounded channel, so the encoder
/// stalls while the consumer is behind. A dropped receiver surfaces as `BrokenPipe`.
pub(crate) struct ChunkWriter {
    tx: mpsc::Sender<Result<Bytes, ProcessingError>>,
    buf: BytesMut,
    chunk_size: usize,
    emitted: u64,
}

impl ChunkWriter {
    pub(crate) fn new(tx: mpsc::Sender<Result<Bytes, ProcessingError>>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            tx,
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size,
            emitted: 0,
        }
    }

    fn send(&mut self, chunk: Bytes) -> io::Result<()> {
        let len = chunk.len() as u64;
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "PNG consumer dropped"))?;
        self.emitted += len;
        Ok(())
    }

    /// Send whatever is buffered. Returns the total number of bytes emitted.
    pub(crate) fn finish(mut self) -> io::Result<u64> {
        if !self.buf.is_empty() {
            let rest = self.buf.split().freeze();
            self.send(rest)?;
        }
        Ok(self.emitted)
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        while self.buf.len() >= self.chunk_size {
            let chunk = self.buf.split_to(self.chunk_size).freeze();
            self.send(chunk)?;
        }
        Ok(data.len())
    }

    // Partial chunks are held until `finish`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
