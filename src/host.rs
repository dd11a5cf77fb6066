//! Runs scripts off the caller's thread.
//!
//! An embedding application hands an [`Executor`] and a script to [`spawn`],
//! keeps its own loop going, and drains output chunks from the returned
//! [`ScriptHandle`] whenever it likes. The executor comes back from
//! [`ScriptHandle::join`] so variables persist into the next script.

use crate::executor::{Executor, Outcome};
use anyhow::{Result, anyhow};
use log::debug;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Chunks the worker may queue before it waits for the host to drain them.
const CHUNK_BACKLOG: usize = 1024;

/// Result of waiting for the next output chunk.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkWait {
    Chunk(String),
    TimedOut,
    /// The script ended and every chunk has been delivered.
    Finished,
}

/// A script running on its own worker thread.
pub struct ScriptHandle {
    chunks: Receiver<String>,
    interrupt: Arc<AtomicBool>,
    worker: JoinHandle<(Executor, Outcome)>,
}

/// Starts `source` on a worker thread.
///
/// The script reads empty input. Its output is delivered only through the
/// handle, one chunk per completed line plus a final partial line.
pub fn spawn(mut executor: Executor, source: impl Into<String>) -> ScriptHandle {
    let source = source.into();
    let (sender, chunks) = mpsc::sync_channel::<String>(CHUNK_BACKLOG);
    let interrupt = Arc::new(AtomicBool::new(false));
    executor.set_interrupt(Arc::clone(&interrupt));

    let worker = thread::spawn(move || {
        executor.set_update_callback(move |chunk| {
            if sender.send(chunk.to_string()).is_err() {
                debug!("output chunk dropped, nobody is listening");
            }
        });
        let outcome = executor.run(&source, &mut io::empty(), &mut io::sink());
        // Dropping the callback closes the channel.
        executor.clear_update_callback();
        executor.clear_interrupt();
        (executor, outcome)
    });

    ScriptHandle {
        chunks,
        interrupt,
        worker,
    }
}

impl ScriptHandle {
    /// Blocking iterator over output chunks. Ends once the script finishes.
    pub fn chunks(&self) -> impl Iterator<Item = String> + '_ {
        self.chunks.iter()
    }

    /// Next chunk if one is ready, without waiting.
    pub fn try_next_chunk(&self) -> Option<String> {
        match self.chunks.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next chunk.
    pub fn wait_chunk(&self, timeout: Duration) -> ChunkWait {
        match self.chunks.recv_timeout(timeout) {
            Ok(chunk) => ChunkWait::Chunk(chunk),
            Err(RecvTimeoutError::Timeout) => ChunkWait::TimedOut,
            Err(RecvTimeoutError::Disconnected) => ChunkWait::Finished,
        }
    }

    /// Hands every chunk to `on_chunk` until the script ends.
    ///
    /// `requested` is checked at least every `poll`; when it is found set it
    /// is reset and the script is interrupted. This lets a signal handler
    /// that can only touch a static flag stop the script.
    pub fn drain_forwarding(
        &self,
        requested: &AtomicBool,
        poll: Duration,
        mut on_chunk: impl FnMut(String) -> Result<()>,
    ) -> Result<()> {
        loop {
            if requested.swap(false, Ordering::SeqCst) {
                debug!("forwarding interrupt request to the script");
                self.interrupt();
            }
            match self.wait_chunk(poll) {
                ChunkWait::Chunk(chunk) => on_chunk(chunk)?,
                ChunkWait::TimedOut => {}
                ChunkWait::Finished => return Ok(()),
            }
        }
    }

    /// Asks the script to stop. It does so at its next output write or before
    /// its next node, whichever comes first.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// The flag behind [`ScriptHandle::interrupt`], for signal handlers and
    /// other threads.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the script and returns the executor with its outcome.
    ///
    /// Chunks that were not drained yet are discarded.
    pub fn join(self) -> Result<(Executor, Outcome)> {
        let ScriptHandle { chunks, worker, .. } = self;
        drop(chunks);
        worker
            .join()
            .map_err(|_| anyhow!("script worker thread panicked"))
    }
}
