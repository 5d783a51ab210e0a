//! Run orchestration: scans, reconciliation passes, concurrent conversion,
//! asset materialization and state persistence.

pub mod convert;
pub mod fs_ops;
pub mod state;

pub use convert::{ConvertOptions, ConvertRun};
pub use state::{StatePaths, ASSETS_FILE, LEDGER_FILE, STATE_DIR};
