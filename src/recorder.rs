//! Start/end record writer
//!
//! The process-wide instrumentation is an [`Instrument`] strategy picked once:
//! [`Recorder`] when instrumentation is enabled, [`Noop`] otherwise. A
//! disabled process never reads the environment again or resolves metadata.
//!
//! # Record layout
//!
//! ```text
//! bt.<key>.<timestamp>   start record   "<call-site> <name>\n"
//! bt.<key>               start alias    -> most recent start record
//!                        session lines  "<timestamp> <call-site> <name>\n"
//! ```
//!
//! The alias and the session record share `bt.<key>`. While the alias exists,
//! `end` appends through it into the most recent start record; without a
//! prior `start`, `end` creates `bt.<key>` as a plain file.

use crate::config::{self, Config};
use crate::error::Result;
use crate::metadata::{CallSite, EventMetadata, StableKey, Timestamp};
use crate::storage::{FsStore, RecordStore};

/// Prefix shared by every record name
pub const RECORD_PREFIX: &str = "bt";

/// Strategy behind the public `start`/`end` entry points
pub trait Instrument: Send + Sync {
    /// Record the start of `name`, called from `site`
    fn start(&self, name: &str, site: &CallSite) -> Result<()>;

    /// Record the end of `name`, called from `site`
    fn end(&self, name: &str, site: &CallSite) -> Result<()>;

    /// Whether calls can have side effects at all
    fn is_active(&self) -> bool {
        true
    }
}

/// Instrumentation compiled out for this process
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Instrument for Noop {
    #[inline]
    fn start(&self, _name: &str, _site: &CallSite) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn end(&self, _name: &str, _site: &CallSite) -> Result<()> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Names of the records addressed by one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNames {
    key: StableKey,
}

impl RecordNames {
    pub fn new(key: StableKey) -> Self {
        Self { key }
    }

    pub fn for_event(name: &str) -> Self {
        Self::new(StableKey::for_name(name))
    }

    /// `bt.<key>.<timestamp>`
    pub fn start_record(&self, timestamp: &Timestamp) -> String {
        format!("{RECORD_PREFIX}.{}.{timestamp}", self.key)
    }

    /// `bt.<key>`, the start alias and the session record
    pub fn session(&self) -> String {
        format!("{RECORD_PREFIX}.{}", self.key)
    }

    pub fn key(&self) -> &StableKey {
        &self.key
    }
}

/// Writes start and session records into a [`RecordStore`]
#[derive(Debug)]
pub struct Recorder<S> {
    store: S,
    disable_var: String,
}

impl Recorder<FsStore> {
    /// Recorder writing files under the configured record directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(FsStore::new(config.record_dir.clone()))
            .with_disable_var(config.disable_var.clone())
    }
}

impl<S: RecordStore> Recorder<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            disable_var: config::DISABLED_VAR.to_string(),
        }
    }

    /// Consult `var` instead of `BT_DISABLED` on each call
    pub fn with_disable_var(mut self, var: impl Into<String>) -> Self {
        self.disable_var = var.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a start with an explicit call site
    pub fn start_at(&self, name: &str, site: &CallSite) -> Result<()> {
        if config::runtime_disabled(&self.disable_var) {
            tracing::trace!(name, "runtime-disabled, skipping start");
            return Ok(());
        }

        let meta = EventMetadata::resolve(name, site)?;
        let names = RecordNames::new(meta.key);
        let record = names.start_record(&meta.timestamp);
        let alias = names.session();

        self.store
            .create_unique(&record, &format!("{} {name}\n", meta.call_site))?;
        // A failure here leaves `record` without an alias; nothing rolls it back
        self.store.create_or_replace_alias(&alias, &record)?;

        tracing::debug!(name, key = %names.key(), record = %record, "start recorded");
        Ok(())
    }

    /// Record an end with an explicit call site
    pub fn end_at(&self, name: &str, site: &CallSite) -> Result<()> {
        if config::runtime_disabled(&self.disable_var) {
            tracing::trace!(name, "runtime-disabled, skipping end");
            return Ok(());
        }

        let meta = EventMetadata::resolve(name, site)?;
        let names = RecordNames::new(meta.key);
        let session = names.session();

        self.store.append_line(
            &session,
            &format!("{} {} {name}\n", meta.timestamp, meta.call_site),
        )?;

        tracing::debug!(name, key = %names.key(), record = %session, "end recorded");
        Ok(())
    }
}

impl<S: RecordStore> Instrument for Recorder<S> {
    fn start(&self, name: &str, site: &CallSite) -> Result<()> {
        self.start_at(name, site)
    }

    fn end(&self, name: &str, site: &CallSite) -> Result<()> {
        self.end_at(name, site)
    }
}

/// Pick the strategy for a configuration
pub fn from_config(config: &Config) -> Box<dyn Instrument> {
    if config.enabled {
        tracing::debug!(dir = %config.record_dir.display(), "timing records enabled");
        Box::new(Recorder::from_config(config))
    } else {
        Box::new(Noop)
    }
}
