//! Scoped timing: start, run a unit of work, always end
//!
//! [`TimingGuard`] records the end when it is finished or dropped, so `end`
//! runs once on every exit path from the work: normal return, `?` early
//! return, and panic unwinding. Errors from the work are handed back
//! untouched after the end has been recorded.

use crate::error::{BtError, Result};
use crate::metadata::CallSite;
use crate::recorder::Instrument;

/// Pending end record for one started event
#[must_use = "dropping the guard immediately records the end"]
pub struct TimingGuard<'a> {
    instrument: &'a dyn Instrument,
    name: &'a str,
    site: CallSite,
    finished: bool,
}

impl<'a> TimingGuard<'a> {
    /// Record the start of `name` and return a guard owing its end
    pub fn begin(instrument: &'a dyn Instrument, name: &'a str, site: CallSite) -> Result<Self> {
        instrument.start(name, &site)?;
        Ok(Self {
            instrument,
            name,
            site,
            finished: false,
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Record the end now and report whether it succeeded
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.instrument.end(self.name, &self.site)
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        // Nobody is left to receive the error
        if let Err(e) = self.instrument.end(self.name, &self.site) {
            tracing::warn!(name = self.name, error = %e, "failed to record end while unwinding");
        }
    }
}

impl std::fmt::Debug for TimingGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingGuard")
            .field("name", &self.name)
            .field("site", &self.site)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Run infallible `work` between a start and an end of `name`
///
/// If `start` fails the work does not run and no end is recorded, unlike a
/// cleanup block that also wraps the start. If the work panics, the end is
/// recorded before the panic continues.
pub fn time_with<T, F>(instrument: &dyn Instrument, name: &str, site: CallSite, work: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    let guard = TimingGuard::begin(instrument, name, site)?;
    let value = work();
    guard.finish()?;
    Ok(value)
}

/// Run fallible `work` between a start and an end of `name`
///
/// A failed `start` skips both the work and the end. The work's error wins
/// over a failed end: it is returned unchanged and the end failure is logged.
pub fn try_time_with<T, E, F>(
    instrument: &dyn Instrument,
    name: &str,
    site: CallSite,
    work: F,
) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: From<BtError>,
{
    let guard = TimingGuard::begin(instrument, name, site)?;
    let outcome = work();
    let ended = guard.finish();

    match outcome {
        Ok(value) => {
            ended?;
            Ok(value)
        }
        Err(work_err) => {
            if let Err(e) = ended {
                tracing::warn!(name, error = %e, "failed to record end after work error");
            }
            Err(work_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Noop, RecordNames, Recorder};
    use crate::storage::MemoryStore;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[derive(Debug, PartialEq)]
    enum JobError {
        Failed(&'static str),
        Timing,
    }

    impl From<BtError> for JobError {
        fn from(_: BtError) -> Self {
            JobError::Timing
        }
    }

    fn recorder() -> Recorder<MemoryStore> {
        Recorder::new(MemoryStore::new()).with_disable_var("BT_SCOPE_UNIT_NEVER_SET")
    }

    fn site() -> CallSite {
        CallSite::explicit("src/work.rs:3:1")
    }

    fn session_lines(rec: &Recorder<MemoryStore>, name: &str) -> Vec<String> {
        rec.store()
            .read(&RecordNames::for_event(name).session())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_time_returns_work_value() {
        let rec = recorder();
        let value = time_with(&rec, "x", site(), || 41 + 1).unwrap();
        assert_eq!(value, 42);
        // start line plus one end line
        assert_eq!(session_lines(&rec, "x").len(), 2);
    }

    #[test]
    fn test_try_time_reraises_work_error_after_end() {
        let rec = recorder();
        let result: std::result::Result<(), JobError> =
            try_time_with(&rec, "x", site(), || Err(JobError::Failed("boom")));
        assert_eq!(result, Err(JobError::Failed("boom")));

        let lines = session_lines(&rec, "x");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" src/work.rs:3 x"));
    }

    #[test]
    fn test_try_time_ok_path() {
        let rec = recorder();
        let result: std::result::Result<&str, JobError> =
            try_time_with(&rec, "ok", site(), || Ok("done"));
        assert_eq!(result, Ok("done"));
        assert_eq!(session_lines(&rec, "ok").len(), 2);
    }

    #[test]
    fn test_try_time_start_failure_skips_work() {
        let rec = recorder();
        let mut ran = false;
        let result: std::result::Result<(), JobError> =
            try_time_with(&rec, "x", CallSite::explicit("nowhere"), || {
                ran = true;
                Ok(())
            });
        assert_eq!(result, Err(JobError::Timing));
        assert!(!ran);
        assert!(rec.store().is_empty());
    }

    #[test]
    fn test_time_start_failure_records_no_end() {
        let rec = recorder();
        let mut ran = false;
        let err = time_with(&rec, "x", CallSite::explicit("nowhere"), || ran = true).unwrap_err();
        assert!(matches!(err, BtError::CallSite { .. }));
        assert!(!ran);
        assert!(session_lines(&rec, "x").is_empty());
    }

    #[test]
    fn test_end_recorded_when_work_panics() {
        let rec = recorder();
        let caught = catch_unwind(AssertUnwindSafe(|| {
            time_with(&rec, "panics", site(), || panic!("work exploded"))
        }));
        assert!(caught.is_err());
        assert_eq!(session_lines(&rec, "panics").len(), 2);
    }

    #[test]
    fn test_guard_drop_records_end_once() {
        let rec = recorder();
        {
            let guard = TimingGuard::begin(&rec, "scoped", site()).unwrap();
            assert_eq!(guard.name(), "scoped");
        }
        assert_eq!(session_lines(&rec, "scoped").len(), 2);

        let guard = TimingGuard::begin(&rec, "finished", site()).unwrap();
        guard.finish().unwrap();
        assert_eq!(session_lines(&rec, "finished").len(), 2);
    }

    #[test]
    fn test_noop_time_runs_work() {
        let value = time_with(&Noop, "x", CallSite::explicit("nowhere"), || "ran").unwrap();
        assert_eq!(value, "ran");
    }
}
