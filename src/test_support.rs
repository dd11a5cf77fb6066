//! Helpers shared by the unit tests.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A fresh path under the system temp dir. Nothing is created.
pub(crate) fn unique_temp_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "cmdscript_{}_{}_{}_{}",
        tag,
        std::process::id(),
        nanos,
        seq
    ))
}

pub(crate) fn make_unique_temp_dir(tag: &str) -> io::Result<PathBuf> {
    let dir = unique_temp_path(tag);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
