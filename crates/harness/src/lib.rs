pub mod board;
pub mod instrumented;

pub use board::TestBoard;
pub use instrumented::{FaultPoint, InstrumentedStorage, InstrumentedTransaction};

use std::path::PathBuf;

use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;

/// Route engine logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}

/// A database path inside a fresh temporary directory. Keep the `TempDir`
/// alive for as long as the database is used.
pub fn temp_database() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("featureboard.db");
    Ok((dir, path))
}
