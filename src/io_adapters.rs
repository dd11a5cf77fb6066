use std::io::{Result as IoResult, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Consumer for streamed output, called once per emitted chunk.
pub type UpdateCallback = Box<dyn FnMut(&str) + Send>;

/// Text of the I/O error raised by writes after an interrupt.
pub(crate) const INTERRUPTED_MESSAGE: &str = "execution interrupted";

/// Write adapter placed in front of every command's output.
///
/// Each write first checks the interrupt flag and fails once it is raised, so
/// a command producing a lot of output stops at its next write. Bytes are
/// passed straight through to the wrapped writer. When a callback is attached,
/// every completed line is also handed to it as a chunk.
pub struct ChunkWriter<'a> {
    inner: &'a mut dyn Write,
    interrupt: Option<Arc<AtomicBool>>,
    on_chunk: Option<UpdateCallback>,
    pending: Vec<u8>,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(inner: &'a mut dyn Write, interrupt: Option<Arc<AtomicBool>>) -> Self {
        Self {
            inner,
            interrupt,
            on_chunk: None,
            pending: Vec::new(),
        }
    }

    pub fn with_callback(mut self, on_chunk: Option<UpdateCallback>) -> Self {
        self.on_chunk = on_chunk;
        self
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn emit_complete_lines(&mut self) {
        let Some(on_chunk) = self.on_chunk.as_mut() else {
            return;
        };
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            on_chunk(&String::from_utf8_lossy(&line));
        }
    }

    /// Hands any trailing partial line to the callback and gives the callback
    /// back to the caller.
    pub fn finish(mut self) -> Option<UpdateCallback> {
        if let Some(on_chunk) = self.on_chunk.as_mut() {
            if !self.pending.is_empty() {
                on_chunk(&String::from_utf8_lossy(&self.pending));
                self.pending.clear();
            }
        }
        self.on_chunk.take()
    }
}

impl Write for ChunkWriter<'_> {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        if self.is_interrupted() {
            // `ErrorKind::Interrupted` would be retried by `write_all`.
            return Err(std::io::Error::other(INTERRUPTED_MESSAGE));
        }
        let written = self.inner.write(data)?;
        if self.on_chunk.is_some() {
            self.pending.extend_from_slice(&data[..written]);
            self.emit_complete_lines();
        }
        Ok(written)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.inner.flush()
    }
}
