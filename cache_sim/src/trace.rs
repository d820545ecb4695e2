use anyhow::Result;

use crate::{
    access::AccessRecord,
    engine::{AccessOutcome, Evicted, Session},
};

/// Observer of a replay. Every hook defaults to doing nothing.
pub trait Trace {
    fn before_access(&mut self, _record: &AccessRecord) -> Result<()> {
        Ok(())
    }
    /// A write bypassed the cache and went to the backing store.
    fn on_write_through(&mut self, _outcome: &AccessOutcome) -> Result<()> {
        Ok(())
    }
    /// A valid line was overwritten by another block.
    fn on_evict(&mut self, _outcome: &AccessOutcome, _evicted: Evicted) -> Result<()> {
        Ok(())
    }
    fn after_access(&mut self, _outcome: &AccessOutcome, _session: &Session) -> Result<()> {
        Ok(())
    }
}

pub struct EmptyTrace {}

impl EmptyTrace {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for EmptyTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace for EmptyTrace {}

impl<T: Trace + ?Sized> Trace for &mut T {
    fn before_access(&mut self, record: &AccessRecord) -> Result<()> {
        (**self).before_access(record)
    }
    fn on_write_through(&mut self, outcome: &AccessOutcome) -> Result<()> {
        (**self).on_write_through(outcome)
    }
    fn on_evict(&mut self, outcome: &AccessOutcome, evicted: Evicted) -> Result<()> {
        (**self).on_evict(outcome, evicted)
    }
    fn after_access(&mut self, outcome: &AccessOutcome, session: &Session) -> Result<()> {
        (**self).after_access(outcome, session)
    }
}
