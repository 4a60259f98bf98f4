//! bt - opt-in start/end timing records keyed by event name
//!
//! Bracket a unit of work with [`start`] and [`end`] (or wrap it in [`time`])
//! and, when the process was launched with `BT_INIT` set, timing records are
//! written to the shared temp directory:
//!
//! ```text
//! /tmp/bt.<md5(name)>.<19-digit timestamp>   "<file:line> <name>"
//! /tmp/bt.<md5(name)>                         "<19-digit timestamp> <file:line> <name>" per end
//! ```
//!
//! Without `BT_INIT` every call is a no-op for the rest of the process.
//! `BT_DISABLED` (any value but `"0"`) suppresses records per call.
//!
//! # Example
//!
//! ```
//! let artifacts = bt::time("build", || {
//!     // expensive work
//!     vec!["app.wasm"]
//! })?;
//! assert_eq!(artifacts.len(), 1);
//! # Ok::<(), bt::BtError>(())
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod recorder;
pub mod scope;
pub mod storage;

pub use config::Config;
pub use error::{BtError, Result};
pub use metadata::{CallSite, StableKey, Timestamp};
pub use recorder::{Instrument, Noop, RecordNames, Recorder};
pub use scope::TimingGuard;
pub use storage::{FsStore, MemoryStore, RecordStore};

use std::sync::OnceLock;

static INSTRUMENT: OnceLock<Box<dyn Instrument>> = OnceLock::new();

/// Process-wide instrumentation, resolved from the environment on first use
pub fn instrument() -> &'static dyn Instrument {
    &**INSTRUMENT.get_or_init(|| recorder::from_config(&Config::from_env()))
}

/// Use `instrument` for this process instead of resolving from the environment
///
/// Fails with [`BtError::AlreadyInstalled`] once any API call (or an earlier
/// `install`) has resolved the process-wide instrumentation.
pub fn install(instrument: impl Instrument + 'static) -> Result<()> {
    INSTRUMENT
        .set(Box::new(instrument))
        .map_err(|_| BtError::AlreadyInstalled)
}

/// Whether calls in this process can write records at all
pub fn is_active() -> bool {
    instrument().is_active()
}

/// Record the start of `name`
#[track_caller]
pub fn start(name: &str) -> Result<()> {
    instrument().start(name, &CallSite::caller())
}

/// Record the end of `name`
#[track_caller]
pub fn end(name: &str) -> Result<()> {
    instrument().end(name, &CallSite::caller())
}

/// Time `work` under `name`; the end is recorded even if `work` panics
#[track_caller]
pub fn time<T, F>(name: &str, work: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    scope::time_with(instrument(), name, CallSite::caller(), work)
}

/// Time fallible `work` under `name`, returning its error unchanged
#[track_caller]
pub fn try_time<T, E, F>(name: &str, work: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: From<BtError>,
{
    scope::try_time_with(instrument(), name, CallSite::caller(), work)
}

/// Record the start of `name`; the returned guard records the end
#[track_caller]
pub fn scoped(name: &str) -> Result<TimingGuard<'_>> {
    TimingGuard::begin(instrument(), name, CallSite::caller())
}

/// Time an expression: `bt_time!("name", expr)` is `bt::time("name", || expr)`
#[macro_export]
macro_rules! bt_time {
    ($name:expr, $body:expr) => {
        $crate::time($name, || $body)
    };
}
